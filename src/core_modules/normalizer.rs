// THEORY:
// The normalizer takes one sprite with pixels in source-image coordinates and
// rebuilds it as a fixed-size canvas: crop to the bounding box, scale to fit,
// center, optionally scrub halo artifacts from the edges, then force alpha to
// be strictly binary. After this stage every sprite owns exactly
// `target_width * target_height` canvas-local pixels and downstream consumers
// (the vectorizer above all) can rely on alpha being 0 or 255, nothing else.
//
// Key architectural principles & algorithm steps:
// 1.  **Exact-reproduction scaling**: resampling is nearest-neighbor only.
//     Destination pixel (dx, dy) reads source (dx * src_w / dst_w,
//     dy * src_h / dst_h). No blending ever happens, so hard pixel-art edges
//     survive and the output is bit-reproducible.
// 2.  **Clamped centering**: the scaled image is placed centered, with the
//     offset clamped to [0, canvas - scaled] per axis. With a uniform-scale
//     override larger than the fit, pixels beyond the canvas are clipped.
// 3.  **Border-seeded cleanup**: both cleanup passes are breadth-first
//     traversals seeded from every border pixel of the canvas. The search
//     moves through transparent pixels and through pixels it just cleared;
//     opaque pixels that fail the clear test block it. Interior pixels that
//     merely look like halo are therefore safe unless they touch the outside.
// 4.  **Binary alpha contract**: with a positive cutoff, surviving pixels are
//     forced fully opaque and everything below the cutoff becomes fully
//     transparent. This is what makes the vectorizer's alpha == 255 test
//     meaningful.

use crate::core_modules::raster::Raster;
use crate::core_modules::sprite::Sprite;
use crate::core_modules::utils::color;
use crate::pipeline::PipelineConfig;
use std::collections::VecDeque;

const EDGE_FUZZ_MIN_BRIGHTNESS: f32 = 0.80;
const EDGE_FUZZ_MAX_SATURATION: f32 = 0.20;

const GLOW_HUE_TOLERANCE: f32 = 0.1;
const GLOW_SATURATION_TOLERANCE: f32 = 0.25;
const GLOW_BRIGHTNESS_TOLERANCE: f32 = 0.25;

const DIRECTIONS_4: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Replaces the sprite's pixel set with a `target_width x target_height`
/// canvas rendering of it: cropped, scaled, centered, cleaned, and alpha
/// solidified. The center of mass is recomputed at the end.
pub fn normalize_sprite(sprite: &mut Sprite, config: &PipelineConfig) {
    tracing::debug!(sprite = sprite.label_id(), "normalizing sprite");

    let Some(cropped) = sprite.to_cropped_raster() else {
        tracing::warn!(
            sprite = sprite.label_id(),
            "empty sprite, emitting transparent canvas"
        );
        finish_with_canvas(
            sprite,
            Raster::new(config.target_width, config.target_height),
        );
        return;
    };

    let visible = cropped
        .pixels()
        .iter()
        .filter(|&&argb| color::alpha(argb) != 0)
        .count();
    if visible == 0 {
        tracing::warn!(
            sprite = sprite.label_id(),
            "sprite is fully transparent, emitting transparent canvas"
        );
        finish_with_canvas(
            sprite,
            Raster::new(config.target_width, config.target_height),
        );
        return;
    }

    let cropped_w = cropped.width();
    let cropped_h = cropped.height();

    let scale = if config.uniform_scale > 0.0 {
        config.uniform_scale
    } else {
        (config.target_width as f64 / cropped_w as f64)
            .min(config.target_height as f64 / cropped_h as f64)
    };
    let scaled_w = ((cropped_w as f64 * scale).round() as u32).max(1);
    let scaled_h = ((cropped_h as f64 * scale).round() as u32).max(1);
    tracing::debug!(
        sprite = sprite.label_id(),
        scale,
        scaled_w,
        scaled_h,
        "scaling bounding box {cropped_w}x{cropped_h}"
    );

    let scaled = nearest_neighbor_scale(&cropped, scaled_w, scaled_h);

    let mut canvas = Raster::new(config.target_width, config.target_height);
    let offset_x = centered_offset(config.target_width, scaled_w);
    let offset_y = centered_offset(config.target_height, scaled_h);
    for y in 0..scaled_h {
        for x in 0..scaled_w {
            if let Some(argb) = scaled.get(x, y) {
                // set() rejects coordinates past the canvas, which is exactly
                // the clipping the clamped offset calls for.
                canvas.set(offset_x + x, offset_y + y, argb);
            }
        }
    }

    if config.enable_edge_trim {
        remove_near_white_edges(&mut canvas);
    }

    if !config.disable_glow_removal {
        tracing::warn!(
            sprite = sprite.label_id(),
            "applying secondary glow removal (discouraged)"
        );
        remove_glow_from_edges(&mut canvas);
    }

    if config.alpha_cutoff > 0 {
        apply_alpha_threshold_and_solidify(&mut canvas, config.alpha_cutoff);
    }

    finish_with_canvas(sprite, canvas);
    tracing::debug!(
        sprite = sprite.label_id(),
        width = config.target_width,
        height = config.target_height,
        "normalization complete"
    );
}

fn finish_with_canvas(sprite: &mut Sprite, canvas: Raster) {
    sprite.replace_pixels_from(&canvas);
    sprite.calculate_center_of_mass();
}

/// The centered placement offset, clamped so the scaled image never starts
/// outside the canvas.
fn centered_offset(canvas_dim: u32, scaled_dim: u32) -> u32 {
    let offset = (canvas_dim as i64 - scaled_dim as i64) / 2;
    offset.clamp(0, (canvas_dim as i64 - scaled_dim as i64).max(0)) as u32
}

/// Nearest-neighbor resample, preserving hard pixel edges.
fn nearest_neighbor_scale(source: &Raster, final_w: u32, final_h: u32) -> Raster {
    let mut scaled = Raster::new(final_w, final_h);
    for y in 0..final_h {
        for x in 0..final_w {
            let source_x = (x as u64 * source.width() as u64 / final_w as u64) as u32;
            let source_y = (y as u64 * source.height() as u64 / final_h as u64) as u32;
            if let Some(argb) = source.get(source_x, source_y) {
                scaled.set(x, y, argb);
            }
        }
    }
    scaled
}

/// Seeds a BFS worklist with every border pixel of a `width x height` grid and
/// returns it together with the matching visited map.
fn border_seeds(width: u32, height: u32) -> (VecDeque<(u32, u32)>, Vec<Vec<bool>>) {
    let mut queue = VecDeque::new();
    let mut visited = vec![vec![false; width as usize]; height as usize];
    for x in 0..width {
        for y in [0, height - 1] {
            if !visited[y as usize][x as usize] {
                visited[y as usize][x as usize] = true;
                queue.push_back((x, y));
            }
        }
    }
    for y in 0..height {
        for x in [0, width - 1] {
            if !visited[y as usize][x as usize] {
                visited[y as usize][x as usize] = true;
                queue.push_back((x, y));
            }
        }
    }
    (queue, visited)
}

/// Clears near-white, low-saturation halo pixels reachable from the canvas
/// border. Opaque pixels that are not halo block the traversal.
fn remove_near_white_edges(canvas: &mut Raster) {
    if canvas.is_empty() {
        return;
    }
    let width = canvas.width();
    let height = canvas.height();
    let (mut queue, mut visited) = border_seeds(width, height);
    let mut removed = 0usize;

    while let Some((x, y)) = queue.pop_front() {
        let Some(argb) = canvas.get(x, y) else {
            continue;
        };

        let passable = if color::alpha(argb) == 0 {
            true
        } else {
            let [_, saturation, brightness] = color::argb_to_hsb(argb);
            if brightness >= EDGE_FUZZ_MIN_BRIGHTNESS && saturation <= EDGE_FUZZ_MAX_SATURATION {
                canvas.set(x, y, color::TRANSPARENT);
                removed += 1;
                true
            } else {
                false
            }
        };
        if !passable {
            continue;
        }

        for (dx, dy) in DIRECTIONS_4 {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                continue;
            }
            let (nx, ny) = (nx as u32, ny as u32);
            if !visited[ny as usize][nx as usize] {
                visited[ny as usize][nx as usize] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    if removed > 0 {
        tracing::debug!(removed, "removed near-white pixels from edges");
    }
}

/// Secondary border cleanup: estimates the background from the four canvas
/// corners and clears reachable pixels close to it in hue, saturation and
/// brightness. Transparent pixels always propagate without a test.
fn remove_glow_from_edges(canvas: &mut Raster) {
    if canvas.is_empty() {
        return;
    }
    let background = estimate_background_hsb_from_corners(canvas);
    let width = canvas.width();
    let height = canvas.height();
    let (mut queue, mut visited) = border_seeds(width, height);

    while let Some((x, y)) = queue.pop_front() {
        let Some(argb) = canvas.get(x, y) else {
            continue;
        };

        let passable = if color::alpha(argb) == 0 {
            true
        } else {
            let hsb = color::argb_to_hsb(argb);
            let dh = color::cyclic_hue_distance(hsb[0], background[0]);
            let ds = (hsb[1] - background[1]).abs();
            let db = (hsb[2] - background[2]).abs();
            if dh <= GLOW_HUE_TOLERANCE
                && ds <= GLOW_SATURATION_TOLERANCE
                && db <= GLOW_BRIGHTNESS_TOLERANCE
            {
                canvas.set(x, y, color::TRANSPARENT);
                true
            } else {
                false
            }
        };
        if !passable {
            continue;
        }

        for (dx, dy) in DIRECTIONS_4 {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                continue;
            }
            let (nx, ny) = (nx as u32, ny as u32);
            if !visited[ny as usize][nx as usize] {
                visited[ny as usize][nx as usize] = true;
                queue.push_back((nx, ny));
            }
        }
    }
}

/// Average HSB of the four canvas corner pixels.
fn estimate_background_hsb_from_corners(canvas: &Raster) -> [f32; 3] {
    let width = canvas.width();
    let height = canvas.height();
    if width == 0 || height == 0 {
        return [0.0, 0.0, 0.0];
    }
    let corners = [
        canvas.get(0, 0),
        canvas.get(width - 1, 0),
        canvas.get(0, height - 1),
        canvas.get(width - 1, height - 1),
    ];
    let mut sum = [0.0f32; 3];
    for corner in corners {
        let hsb = color::argb_to_hsb(corner.unwrap_or(color::TRANSPARENT));
        sum[0] += hsb[0];
        sum[1] += hsb[1];
        sum[2] += hsb[2];
    }
    [sum[0] / 4.0, sum[1] / 4.0, sum[2] / 4.0]
}

/// Applies the alpha cutoff: opaque pixels below the cutoff become fully
/// transparent, everything else becomes fully opaque. Afterwards alpha is
/// strictly binary.
fn apply_alpha_threshold_and_solidify(canvas: &mut Raster, cutoff: u32) {
    let mut to_transparent = 0usize;
    let mut to_opaque = 0usize;

    for y in 0..canvas.height() {
        for x in 0..canvas.width() {
            let Some(argb) = canvas.get(x, y) else {
                continue;
            };
            let alpha = color::alpha(argb);
            if alpha == 0 {
                continue;
            }
            if alpha < cutoff {
                canvas.set(x, y, color::TRANSPARENT);
                to_transparent += 1;
            } else {
                canvas.set(x, y, 0xFF00_0000 | color::rgb(argb));
                to_opaque += 1;
            }
        }
    }

    tracing::debug!(to_transparent, to_opaque, "alpha threshold applied");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_64() -> PipelineConfig {
        PipelineConfig {
            target_width: 64,
            target_height: 64,
            ..PipelineConfig::default()
        }
    }

    fn block_sprite(x0: u32, y0: u32, w: u32, h: u32, argb: u32) -> Sprite {
        let mut sprite = Sprite::new(1);
        for x in x0..x0 + w {
            for y in y0..y0 + h {
                sprite.add_pixel(x, y, argb);
            }
        }
        sprite
    }

    #[test]
    fn red_block_fills_the_whole_target_canvas() {
        // A 100x100 red block somewhere in a 1024x1024 coordinate space scales
        // by 0.64 to exactly 64x64 and covers every canvas pixel.
        let mut sprite = block_sprite(400, 400, 100, 100, 0xFFFF0000);
        normalize_sprite(&mut sprite, &config_64());

        assert_eq!(sprite.pixel_count(), 64 * 64);
        let canvas = sprite.to_cropped_raster().unwrap();
        assert_eq!(canvas.width(), 64);
        assert_eq!(canvas.height(), 64);
        for &argb in canvas.pixels() {
            assert_eq!(argb, 0xFFFF0000);
        }

        // Center of mass lands within 15% of the geometric center.
        let expected = 32.0;
        let tolerance = 64.0 * 0.15;
        assert!((sprite.center_x() - expected).abs() < tolerance);
        assert!((sprite.center_y() - expected).abs() < tolerance);
    }

    #[test]
    fn empty_sprite_yields_fully_transparent_canvas() {
        let mut sprite = Sprite::new(9);
        normalize_sprite(&mut sprite, &config_64());

        assert_eq!(sprite.pixel_count(), 64 * 64);
        let canvas = sprite.to_cropped_raster().unwrap();
        assert!(canvas.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn fully_transparent_sprite_yields_transparent_canvas() {
        let mut sprite = Sprite::new(2);
        sprite.add_pixel(3, 3, 0x00FF00FF);
        sprite.add_pixel(4, 3, 0x00123456);
        normalize_sprite(&mut sprite, &config_64());

        let canvas = sprite.to_cropped_raster().unwrap();
        assert_eq!(canvas.width(), 64);
        assert!(canvas.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn narrow_sprite_is_centered_with_transparent_margins() {
        // 10x50 block: fit scale is 64/50 = 1.28, scaled to 13x64, centered
        // horizontally at offset (64 - 13) / 2 = 25.
        let mut sprite = block_sprite(0, 0, 10, 50, 0xFF0000FF);
        normalize_sprite(&mut sprite, &config_64());

        let canvas = sprite.to_cropped_raster().unwrap();
        assert_eq!(canvas.get(24, 32), Some(0x00000000));
        assert_eq!(canvas.get(25, 32), Some(0xFF0000FF));
        assert_eq!(canvas.get(37, 32), Some(0xFF0000FF));
        assert_eq!(canvas.get(38, 32), Some(0x00000000));
    }

    #[test]
    fn uniform_scale_override_beats_the_fit() {
        // 10x10 block with a 2.0 override lands as a 20x20 block centered at
        // offset 22.
        let mut sprite = block_sprite(0, 0, 10, 10, 0xFF00FF00);
        let config = PipelineConfig {
            uniform_scale: 2.0,
            ..config_64()
        };
        normalize_sprite(&mut sprite, &config);

        let canvas = sprite.to_cropped_raster().unwrap();
        assert_eq!(canvas.get(21, 22), Some(0x00000000));
        assert_eq!(canvas.get(22, 22), Some(0xFF00FF00));
        assert_eq!(canvas.get(41, 41), Some(0xFF00FF00));
        assert_eq!(canvas.get(42, 42), Some(0x00000000));
    }

    #[test]
    fn oversized_override_is_clipped_at_the_canvas() {
        // Scale 10x10 by 10.0: the 100x100 result is clipped to the canvas
        // with offset clamped to zero.
        let mut sprite = block_sprite(0, 0, 10, 10, 0xFFAA5500);
        let config = PipelineConfig {
            uniform_scale: 10.0,
            ..config_64()
        };
        normalize_sprite(&mut sprite, &config);

        assert_eq!(sprite.pixel_count(), 64 * 64);
        let canvas = sprite.to_cropped_raster().unwrap();
        assert!(canvas.pixels().iter().all(|&p| p == 0xFFAA5500));
    }

    #[test]
    fn alpha_is_strictly_binary_after_solidify() {
        let mut sprite = Sprite::new(4);
        for x in 0..10 {
            for y in 0..10 {
                // Alternating faint and strong alpha values.
                let alpha = if (x + y) % 2 == 0 { 0x40u32 } else { 0xF0 };
                sprite.add_pixel(x, y, (alpha << 24) | 0x00336699);
            }
        }
        let config = PipelineConfig {
            target_width: 10,
            target_height: 10,
            uniform_scale: 1.0,
            ..PipelineConfig::default()
        };
        normalize_sprite(&mut sprite, &config);

        let canvas = sprite.to_cropped_raster().unwrap();
        for &argb in canvas.pixels() {
            let alpha = color::alpha(argb);
            assert!(alpha == 0 || alpha == 0xFF, "alpha {alpha:02X} is not binary");
        }
        // The faint half fell below the default cutoff of 120.
        let opaque = canvas
            .pixels()
            .iter()
            .filter(|&&p| color::alpha(p) == 0xFF)
            .count();
        assert_eq!(opaque, 50);
    }

    #[test]
    fn edge_trim_clears_a_near_white_halo_but_not_the_core() {
        // A dark 6x6 core wrapped in a near-white ring, placed 1:1 on a 10x10
        // canvas. The ring touches transparency on all sides and is removed;
        // the dark core blocks the search and survives.
        let mut sprite = Sprite::new(5);
        for x in 1..9u32 {
            for y in 1..9u32 {
                let is_core = (2..8).contains(&x) && (2..8).contains(&y);
                let argb = if is_core { 0xFF203040 } else { 0xFFF8F8F8 };
                sprite.add_pixel(x, y, argb);
            }
        }
        let config = PipelineConfig {
            target_width: 10,
            target_height: 10,
            uniform_scale: 1.0,
            enable_edge_trim: true,
            ..PipelineConfig::default()
        };
        normalize_sprite(&mut sprite, &config);

        let canvas = sprite.to_cropped_raster().unwrap();
        assert_eq!(canvas.get(1, 1), Some(0x00000000)); // halo gone
        assert_eq!(canvas.get(4, 1), Some(0x00000000));
        assert_eq!(canvas.get(4, 4), Some(0xFF203040)); // core intact
        assert_eq!(canvas.get(7, 7), Some(0xFF203040));
    }

    #[test]
    fn interior_near_white_pixels_survive_edge_trim() {
        // Near-white pixels fully enclosed by a dark ring are unreachable from
        // the border and must not be cleared.
        let mut sprite = Sprite::new(6);
        for x in 1..9u32 {
            for y in 1..9u32 {
                let is_interior = (3..7).contains(&x) && (3..7).contains(&y);
                let argb = if is_interior { 0xFFFFFFFF } else { 0xFF101010 };
                sprite.add_pixel(x, y, argb);
            }
        }
        let config = PipelineConfig {
            target_width: 10,
            target_height: 10,
            uniform_scale: 1.0,
            enable_edge_trim: true,
            ..PipelineConfig::default()
        };
        normalize_sprite(&mut sprite, &config);

        let canvas = sprite.to_cropped_raster().unwrap();
        assert_eq!(canvas.get(4, 4), Some(0xFFFFFFFF));
        assert_eq!(canvas.get(2, 2), Some(0xFF101010));
    }

    #[test]
    fn glow_removal_clears_pixels_near_the_corner_estimate() {
        // Corners are transparent (HSB 0,0,0), so dark low-saturation pixels
        // near the border fall inside the glow tolerances and are cleared,
        // while a bright saturated core blocks the pass.
        let mut sprite = Sprite::new(7);
        for x in 1..9u32 {
            for y in 1..9u32 {
                let is_core = (3..7).contains(&x) && (3..7).contains(&y);
                let argb = if is_core { 0xFFFF0000 } else { 0xFF202020 };
                sprite.add_pixel(x, y, argb);
            }
        }
        let config = PipelineConfig {
            target_width: 10,
            target_height: 10,
            uniform_scale: 1.0,
            disable_glow_removal: false,
            alpha_cutoff: 0,
            ..PipelineConfig::default()
        };
        normalize_sprite(&mut sprite, &config);

        let canvas = sprite.to_cropped_raster().unwrap();
        assert_eq!(canvas.get(1, 1), Some(0x00000000)); // dark rim cleared
        assert_eq!(canvas.get(4, 4), Some(0xFFFF0000)); // core survives
    }

    #[test]
    fn minimum_scaled_dimension_is_one_pixel() {
        // A 1x40 sliver scaled to fit 8x8 rounds its width to 0.2 -> min 1.
        let mut sprite = block_sprite(0, 0, 1, 40, 0xFF445566);
        let config = PipelineConfig {
            target_width: 8,
            target_height: 8,
            ..PipelineConfig::default()
        };
        normalize_sprite(&mut sprite, &config);

        let canvas = sprite.to_cropped_raster().unwrap();
        assert_eq!(canvas.width(), 8);
        let opaque: Vec<(u32, u32)> = (0..8)
            .flat_map(|y| (0..8).map(move |x| (x, y)))
            .filter(|&(x, y)| color::alpha(canvas.get(x, y).unwrap()) != 0)
            .collect();
        // One column, eight rows, centered horizontally.
        assert_eq!(opaque.len(), 8);
        assert!(opaque.iter().all(|&(x, _)| x == 3));
    }
}
