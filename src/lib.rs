// THEORY:
// This file is the main entry point for the `sprite_vision` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the
// public API that will be exposed to external consumers (CLI front ends,
// asset build steps, services).
//
// The primary goal is to export the `SpritePipeline` and its associated data
// structures (`PipelineConfig`, `SpriteOutput`, `Raster`) as the clean,
// high-level interface for the whole engine. The stage implementations live
// in `core_modules` and remain reachable for callers that want to drive the
// stages individually, for example to inspect the label grid between
// segmentation and aggregation.

pub mod core_modules;
pub mod parallel_pipeline;
pub mod pipeline;

// Re-export key data structures for the public API.
pub use crate::core_modules::raster::{Argb, Raster};
pub use crate::core_modules::sprite::{Sprite, SpritePixel};
pub use crate::parallel_pipeline::ParallelSpritePipeline;
pub use crate::pipeline::{OutputFormat, PipelineConfig, SpriteOutput, SpritePipeline};
