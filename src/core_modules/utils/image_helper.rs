// Bridges between the engine's `Raster` and the `image` crate, plus the
// debugging visualizers. Nothing in the pipeline stages depends on this
// module; it exists so callers can decode a file, hand the pixels to the
// pipeline, and write results back out without re-implementing the plumbing.

use crate::core_modules::raster::{Argb, Raster};
use crate::core_modules::region_labeler::LabelGrid;
use crate::core_modules::sprite::Sprite;
use crate::core_modules::utils::color;
use image::ImageEncoder;
use std::path::Path;

/// Converts a decoded RGBA image into a raster of ARGB pixels.
pub fn raster_from_rgba(source: &image::RgbaImage) -> Raster {
    let width = source.width();
    let height = source.height();
    let mut raster = Raster::new(width, height);
    for (x, y, pixel) in source.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        raster.set(x, y, color::compose(a as u32, r as u32, g as u32, b as u32));
    }
    raster
}

/// Converts a raster into an RGBA image suitable for encoding.
pub fn raster_to_rgba(raster: &Raster) -> image::RgbaImage {
    image::RgbaImage::from_fn(raster.width(), raster.height(), |x, y| {
        let argb = raster.get(x, y).unwrap_or(color::TRANSPARENT);
        image::Rgba([
            color::red(argb) as u8,
            color::green(argb) as u8,
            color::blue(argb) as u8,
            color::alpha(argb) as u8,
        ])
    })
}

/// Encodes a raster as a PNG file.
pub fn save_png(raster: &Raster, path: &Path) -> Result<(), image::error::ImageError> {
    let output = std::fs::File::create(path)?;
    let encoder = image::codecs::png::PngEncoder::new(output);
    encoder.write_image(
        raster_to_rgba(raster).as_raw(),
        raster.width(),
        raster.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(())
}

/// Renders a label grid with one deterministic color per region, background
/// transparent. Useful for eyeballing what the labeler found.
pub fn visualize_regions(labels: &LabelGrid) -> Raster {
    let mut out = Raster::new(labels.width(), labels.height());
    for y in 0..labels.height() {
        for x in 0..labels.width() {
            let label = labels.get(x, y).unwrap_or(0);
            if label > 0 {
                out.set(x, y, label_color(label));
            }
        }
    }
    out
}

/// Renders sprite pixel sets onto a transparent canvas of the base raster's
/// dimensions, one color per sprite. Out-of-bounds pixel records are skipped.
pub fn visualize_sprites(base: &Raster, sprites: &[Sprite]) -> Raster {
    let mut out = Raster::new(base.width(), base.height());
    for (index, sprite) in sprites.iter().enumerate() {
        let argb = label_color(index as u32 + 1);
        for pixel in sprite.pixels() {
            if !out.set(pixel.x, pixel.y, argb) {
                tracing::warn!(
                    x = pixel.x,
                    y = pixel.y,
                    sprite = sprite.label_id(),
                    "sprite pixel outside canvas bounds"
                );
            }
        }
    }
    out
}

/// Golden-angle hue stepping: consecutive labels get visually distant colors
/// without any random state.
fn label_color(label: u32) -> Argb {
    let hue = (label as f32 * 0.618_034) % 1.0;
    color::hsb_to_argb(hue, 0.8, 0.95)
}
