// THEORY:
// Single-pixel color math for the sprite engine. Everything here operates on one
// ARGB value (or one HSB triple) at a time; nothing reads neighbors or carries
// state. The cleanup passes in the normalizer and the visualization helpers are
// the main consumers.
//
// The HSB conversions intentionally follow the classic AWT formulation (hue,
// saturation and brightness all normalized to [0, 1]) because the edge-fuzz and
// glow thresholds in the normalizer are calibrated against exactly that scale.

use crate::core_modules::raster::{Argb, Raster};
use thiserror::Error;

/// A fully transparent pixel.
pub const TRANSPARENT: Argb = 0x0000_0000;

/// Errors produced by the color utilities.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    /// `hue_distance` was handed an empty HSB channel slice.
    #[error("hue distance requires non-empty HSB channel slices")]
    EmptyHsbInput,
}

/// The alpha channel of an ARGB value (0-255).
pub fn alpha(argb: Argb) -> u32 {
    (argb >> 24) & 0xFF
}

/// The red channel of an ARGB value (0-255).
pub fn red(argb: Argb) -> u32 {
    (argb >> 16) & 0xFF
}

/// The green channel of an ARGB value (0-255).
pub fn green(argb: Argb) -> u32 {
    (argb >> 8) & 0xFF
}

/// The blue channel of an ARGB value (0-255).
pub fn blue(argb: Argb) -> u32 {
    argb & 0xFF
}

/// The low 24 RGB bits, with alpha stripped.
pub fn rgb(argb: Argb) -> u32 {
    argb & 0x00FF_FFFF
}

/// Assembles an ARGB value from individual channels. Channel values above 255
/// are truncated to their low byte.
pub fn compose(a: u32, r: u32, g: u32, b: u32) -> Argb {
    ((a & 0xFF) << 24) | ((r & 0xFF) << 16) | ((g & 0xFF) << 8) | (b & 0xFF)
}

/// Color binning (posterization) of a single ARGB value: each RGB channel is
/// mapped to the start of its bin, capped at 255. Alpha is unchanged. A bin
/// size of 1 or less is a no-op.
pub fn bin_color_argb(argb: Argb, bin_size: u32) -> Argb {
    if bin_size <= 1 {
        return argb;
    }
    let bin = |channel: u32| (channel / bin_size * bin_size).min(255);
    compose(
        alpha(argb),
        bin(red(argb)),
        bin(green(argb)),
        bin(blue(argb)),
    )
}

/// Applies [`bin_color_argb`] to every pixel of a raster in place.
pub fn bin_raster_colors(raster: &mut Raster, bin_size: u32) {
    if bin_size <= 1 {
        return;
    }
    for y in 0..raster.height() {
        for x in 0..raster.width() {
            if let Some(argb) = raster.get(x, y) {
                raster.set(x, y, bin_color_argb(argb, bin_size));
            }
        }
    }
}

/// Converts the RGB channels of an ARGB value to an `[hue, saturation,
/// brightness]` triple, each in [0, 1]. Alpha is ignored.
pub fn argb_to_hsb(argb: Argb) -> [f32; 3] {
    let r = red(argb) as f32;
    let g = green(argb) as f32;
    let b = blue(argb) as f32;

    let cmax = r.max(g.max(b));
    let cmin = r.min(g.min(b));

    let brightness = cmax / 255.0;
    let saturation = if cmax > 0.0 { (cmax - cmin) / cmax } else { 0.0 };

    if saturation == 0.0 {
        return [0.0, saturation, brightness];
    }

    let chroma = cmax - cmin;
    let red_c = (cmax - r) / chroma;
    let green_c = (cmax - g) / chroma;
    let blue_c = (cmax - b) / chroma;

    let sector = if r == cmax {
        blue_c - green_c
    } else if g == cmax {
        2.0 + red_c - blue_c
    } else {
        4.0 + green_c - red_c
    };
    let mut hue = sector / 6.0;
    if hue < 0.0 {
        hue += 1.0;
    }
    [hue, saturation, brightness]
}

/// Converts an HSB triple (all channels in [0, 1]) to a fully opaque ARGB
/// value.
pub fn hsb_to_argb(hue: f32, saturation: f32, brightness: f32) -> Argb {
    if saturation <= 0.0 {
        let v = (brightness * 255.0 + 0.5) as u32;
        return compose(0xFF, v, v, v);
    }

    let h = (hue - hue.floor()) * 6.0;
    let f = h - h.floor();
    let p = brightness * (1.0 - saturation);
    let q = brightness * (1.0 - saturation * f);
    let t = brightness * (1.0 - saturation * (1.0 - f));

    let (r, g, b) = match h as u32 {
        0 => (brightness, t, p),
        1 => (q, brightness, p),
        2 => (p, brightness, t),
        3 => (p, q, brightness),
        4 => (t, p, brightness),
        _ => (brightness, p, q),
    };
    compose(
        0xFF,
        (r * 255.0 + 0.5) as u32,
        (g * 255.0 + 0.5) as u32,
        (b * 255.0 + 0.5) as u32,
    )
}

/// The shortest distance between two hues on the color wheel, in [0, 0.5].
/// Both hues must be normalized to [0, 1].
pub fn cyclic_hue_distance(hue1: f32, hue2: f32) -> f32 {
    let dh = (hue1 - hue2).abs();
    dh.min(1.0 - dh)
}

/// The shortest hue distance between two HSB triples. Only the hue channel
/// (index 0) is consulted; the slices exist so callers can pass full HSB
/// triples directly. Empty slices fail fast with a distinct error.
pub fn hue_distance(hsb1: &[f32], hsb2: &[f32]) -> Result<f32, ColorError> {
    if hsb1.is_empty() || hsb2.is_empty() {
        return Err(ColorError::EmptyHsbInput);
    }
    Ok(cyclic_hue_distance(hsb1[0], hsb2[0]))
}
