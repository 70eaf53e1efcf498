// THEORY:
// The `pipeline` module is the top-level API for the sprite engine. It wires
// the stages together in their dependency order and owns the two policies
// that do not belong to any single stage: skipping background isolation when
// the source already carries transparency, and deciding which output formats
// each retained sprite is rendered to. Everything it returns is plain data;
// file naming, writing and logging setup stay with the caller.

use crate::core_modules::raster::Raster;
use crate::core_modules::sprite::Sprite;
use crate::core_modules::{aggregator, background, normalizer, region_labeler, vectorizer};
use std::collections::HashSet;

/// Output renderings a caller can request per sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Png,
    Svg,
}

/// Configuration for the sprite pipeline, allowing for tunable behavior.
/// An immutable value object; construct once, pass by reference.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Reserved morphology tuning; carried for compatibility, consumed by
    /// nothing in the current pipeline.
    pub erosion_neighbors_threshold: u32,
    /// Reserved morphology tuning; carried for compatibility, consumed by
    /// nothing in the current pipeline.
    pub dilation_neighbors_threshold: u32,
    /// Reserved noise tuning. The aggregator's noise floor is a fixed 10
    /// pixels and does not read this value.
    pub min_noise_size: u32,
    /// Bin size for the auxiliary color-binning utility. Not used by the
    /// main pipeline path.
    pub color_binning_size: u32,
    /// The number of principal sprites to retain.
    pub top_n_sprites: usize,
    /// Target canvas width for normalized sprites.
    pub target_width: u32,
    /// Target canvas height for normalized sprites.
    pub target_height: u32,
    /// Uniform scale override applied when > 0; otherwise the normalizer
    /// computes the largest aspect-preserving fit.
    pub uniform_scale: f64,
    /// Alpha threshold for the solidify pass (0 disables it).
    pub alpha_cutoff: u32,
    /// Enables near-white edge-fuzz removal.
    pub enable_edge_trim: bool,
    /// Enables merging leftover fragments into the principal sprites.
    pub enable_leftover_merge: bool,
    /// Keeps the secondary glow-removal pass off. On by default; turning the
    /// pass on is discouraged and kept only for compatibility.
    pub disable_glow_removal: bool,
    /// The set of output renderings to produce per sprite.
    pub output_formats: HashSet<OutputFormat>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            erosion_neighbors_threshold: 0,
            dilation_neighbors_threshold: 0,
            min_noise_size: 5,
            color_binning_size: 0,
            top_n_sprites: 4,
            target_width: 64,
            target_height: 64,
            uniform_scale: 0.0,
            alpha_cutoff: 120,
            enable_edge_trim: false,
            enable_leftover_merge: false,
            disable_glow_removal: true,
            output_formats: HashSet::from([OutputFormat::Png, OutputFormat::Svg]),
        }
    }
}

/// One retained sprite, fully processed.
#[derive(Debug, Clone)]
pub struct SpriteOutput {
    /// The sprite's originating region label.
    pub label_id: u32,
    /// The normalized canvas, exactly `target_width x target_height`.
    pub raster: Raster,
    /// Center of mass of the normalized pixel set.
    pub center_of_mass: (f64, f64),
    /// The SVG rendering, present when `Svg` was requested.
    pub svg: Option<String>,
}

/// The main, top-level struct for the sprite engine.
pub struct SpritePipeline {
    config: PipelineConfig,
}

impl SpritePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the full pipeline over a source raster and returns the retained
    /// sprites in size order.
    pub fn process(&self, source: &Raster) -> Vec<SpriteOutput> {
        // Stage 1: Background Isolation (skipped when the source already has
        // transparency to anchor the segmentation on).
        let prepared = if source.has_transparent_pixel() {
            tracing::debug!("source already transparent, skipping background isolation");
            source.clone()
        } else {
            background::isolate_background(source)
        };

        // Stage 2: Region Labeling
        let labels = region_labeler::label_regions(&prepared);

        // Stage 3: Sprite Aggregation
        let sprites = aggregator::extract_sprites(
            &prepared,
            &labels,
            self.config.top_n_sprites,
            &self.config,
        );
        tracing::info!(count = sprites.len(), "retained sprites");

        // Stages 4 + 5: per-sprite Normalization and Vector Rendering. The
        // sprites are independent from here on.
        sprites
            .into_iter()
            .map(|mut sprite| {
                normalizer::normalize_sprite(&mut sprite, &self.config);
                materialize_output(sprite, &self.config)
            })
            .collect()
    }
}

/// Renders a normalized sprite into its final output form. Shared by the
/// sequential and parallel pipelines.
pub(crate) fn materialize_output(sprite: Sprite, config: &PipelineConfig) -> SpriteOutput {
    let svg = config
        .output_formats
        .contains(&OutputFormat::Svg)
        .then(|| vectorizer::vectorize_sprite(&sprite));
    let raster = sprite
        .to_cropped_raster()
        .unwrap_or_else(|| Raster::new(config.target_width, config.target_height));
    SpriteOutput {
        label_id: sprite.label_id(),
        center_of_mass: (sprite.center_x(), sprite.center_y()),
        raster,
        svg,
    }
}
