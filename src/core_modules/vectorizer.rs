// THEORY:
// The vectorizer is the smallest stage and deliberately so: it converts a
// normalized sprite raster into an SVG document made of one unit rectangle per
// fully opaque pixel. No adjacent-rectangle merging, no path tracing. Because
// the normalizer guarantees binary alpha, "alpha == 255" selects exactly the
// visible pixels, and the emitted fill colors need no alpha component. The
// scan order is row-major, so the same raster always produces the same bytes,
// which is what the compatibility tests rely on.

use crate::core_modules::raster::Raster;
use crate::core_modules::sprite::Sprite;
use crate::core_modules::utils::color;

/// Renders a sprite as an SVG string, one 1x1 `<rect>` per fully opaque
/// pixel. An empty sprite yields a minimal 0x0 document.
pub fn vectorize_sprite(sprite: &Sprite) -> String {
    match sprite.to_cropped_raster() {
        Some(raster) => vectorize_raster(&raster),
        None => {
            tracing::warn!(
                sprite = sprite.label_id(),
                "cannot vectorize empty sprite, returning empty document"
            );
            empty_document(0, 0)
        }
    }
}

/// Renders a raster as an SVG string. Pixels with partial or zero alpha are
/// skipped entirely. A zero-dimension raster yields a minimal document with
/// matching declared dimensions.
pub fn vectorize_raster(raster: &Raster) -> String {
    let width = raster.width();
    let height = raster.height();
    if raster.is_empty() {
        return empty_document(width, height);
    }

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" \
         viewBox=\"0 0 {width} {height}\" shape-rendering=\"crispEdges\">"
    ));

    let mut opaque_pixel_count = 0usize;
    for y in 0..height {
        for x in 0..width {
            let Some(argb) = raster.get(x, y) else {
                continue;
            };
            if color::alpha(argb) == 255 {
                opaque_pixel_count += 1;
                svg.push_str(&format!(
                    "<rect x=\"{x}\" y=\"{y}\" width=\"1\" height=\"1\" \
                     fill=\"#{:02X}{:02X}{:02X}\"/>",
                    color::red(argb),
                    color::green(argb),
                    color::blue(argb),
                ));
            }
        }
    }

    svg.push_str("</svg>");
    tracing::debug!(opaque_pixel_count, "vectorization complete");
    svg
}

fn empty_document(width: u32, height: u32) -> String {
    format!("<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\"></svg>")
}
