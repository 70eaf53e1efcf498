// THEORY:
// The aggregator turns a label grid back into sprite entities and applies the
// retention policy: drop noise, keep the biggest N shapes, and (optionally)
// fold the remaining fragments into whichever principal sprite they sit
// closest to. Generative models love to shed ten-pixel crumbs around a shape;
// this stage is where those crumbs either disappear or rejoin their owner.
//
// Key architectural principles & algorithm steps:
// 1.  **Grouping**: every labeled pixel is appended to the sprite keyed by its
//     label. Sprites are kept in a `BTreeMap` so iteration is ascending by
//     label id, which makes every later step deterministic.
// 2.  **Noise floor**: sprites under 10 pixels are discarded outright. The
//     floor is fixed, not configured.
// 3.  **Ordering**: survivors sort by descending pixel count; equal counts
//     keep ascending label order (the sort is stable over the map order).
// 4.  **No truncation without merging**: when merging is disabled the full
//     sorted list is returned even if it is longer than N.
// 5.  **Leftover unification**: leftovers merge greedily. The scan restarts
//     from the beginning after every merge and repeats until no pair of
//     leftover centers is within 20.0. This is a fixed point of a
//     first-pair-wins policy, reproduced exactly as documented.
// 6.  **Reattachment**: each unified cluster is absorbed by the main sprite
//     with the nearest center of mass (squared distance), and that sprite's
//     center is refreshed after every merge. With no main sprites the cluster
//     is dropped with a diagnostic, never an error.

use crate::core_modules::raster::Raster;
use crate::core_modules::region_labeler::LabelGrid;
use crate::core_modules::sprite::Sprite;
use crate::pipeline::PipelineConfig;
use std::collections::BTreeMap;

/// Minimum pixel count for a region to survive as a sprite.
const MIN_PIXEL_COUNT_THRESHOLD: usize = 10;

/// Maximum center-of-mass distance at which two leftover sprites unify.
const LEFTOVER_UNIFY_DISTANCE: f64 = 20.0;

/// Groups labeled pixels into sprites and applies noise filtering, ordering
/// and the optional leftover-merge policy. Returns at most `expected_count`
/// sprites when merging is enabled; may return more when it is disabled.
pub fn extract_sprites(
    raster: &Raster,
    labels: &LabelGrid,
    expected_count: usize,
    config: &PipelineConfig,
) -> Vec<Sprite> {
    if labels.width() == 0 || labels.height() == 0 {
        tracing::warn!("empty label grid, no sprites to extract");
        return Vec::new();
    }
    tracing::debug!(regions = labels.region_count(), "starting sprite extraction");

    let mut sprite_map: BTreeMap<u32, Sprite> = BTreeMap::new();
    for y in 0..labels.height() {
        for x in 0..labels.width() {
            let label = labels.get(x, y).unwrap_or(0);
            if label == 0 {
                continue;
            }
            let sprite = sprite_map.entry(label).or_insert_with(|| Sprite::new(label));
            match raster.get(x, y) {
                Some(argb) => sprite.add_pixel(x, y, argb),
                // A label grid wider than its raster should not happen, but a
                // single unreadable pixel never aborts the stage.
                None => tracing::warn!(x, y, label, "coordinate outside raster, skipping pixel"),
            }
        }
    }

    for sprite in sprite_map.values_mut() {
        sprite.calculate_center_of_mass();
    }

    let mut all_sprites: Vec<Sprite> = sprite_map.into_values().collect();
    all_sprites.retain(|sprite| sprite.pixel_count() >= MIN_PIXEL_COUNT_THRESHOLD);
    // Stable sort over ascending-label input: equal counts stay in label order.
    all_sprites.sort_by(|a, b| b.pixel_count().cmp(&a.pixel_count()));
    tracing::debug!(count = all_sprites.len(), "sprites after noise filtering");

    if all_sprites.len() <= expected_count || !config.enable_leftover_merge {
        return all_sprites;
    }

    let leftovers = all_sprites.split_off(expected_count);
    let mut main_sprites = all_sprites;
    tracing::debug!(
        main = main_sprites.len(),
        leftovers = leftovers.len(),
        "merging leftover fragments"
    );

    for mut leftover in unify_close_sprites(leftovers) {
        leftover.calculate_center_of_mass();
        let Some(closest) =
            find_closest_sprite(&main_sprites, leftover.center_x(), leftover.center_y())
        else {
            tracing::warn!(
                leftover = leftover.label_id(),
                "no main sprite available for leftover cluster, dropping"
            );
            continue;
        };
        main_sprites[closest].absorb(&leftover);
    }

    tracing::debug!(count = main_sprites.len(), "sprite extraction complete");
    main_sprites
}

/// Index of the sprite whose center of mass is nearest to (x, y) by squared
/// distance, or `None` for an empty candidate list.
fn find_closest_sprite(candidates: &[Sprite], x: f64, y: f64) -> Option<usize> {
    let mut closest = None;
    let mut min_distance_sq = f64::MAX;
    for (index, sprite) in candidates.iter().enumerate() {
        let dx = sprite.center_x() - x;
        let dy = sprite.center_y() - y;
        let distance_sq = dx * dx + dy * dy;
        if distance_sq < min_distance_sq {
            min_distance_sq = distance_sq;
            closest = Some(index);
        }
    }
    closest
}

/// Greedy unification of leftover sprites: the first pair of centers found
/// within [`LEFTOVER_UNIFY_DISTANCE`] merges, and the scan restarts, until no
/// such pair remains.
fn unify_close_sprites(leftovers: Vec<Sprite>) -> Vec<Sprite> {
    let mut working = leftovers;
    let mut merged_something = true;

    while merged_something {
        merged_something = false;

        'scan: for i in 0..working.len() {
            for j in (i + 1)..working.len() {
                let dx = working[i].center_x() - working[j].center_x();
                let dy = working[i].center_y() - working[j].center_y();
                let distance = (dx * dx + dy * dy).sqrt();

                if distance < LEFTOVER_UNIFY_DISTANCE {
                    let absorbed = working.remove(j);
                    working[i].absorb(&absorbed);
                    merged_something = true;
                    break 'scan;
                }
            }
        }
    }

    working
}
