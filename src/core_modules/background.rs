// THEORY:
// Background isolation is deliberately the dumbest stage in the pipeline. The
// generated images this engine consumes place their shapes on a flat backdrop,
// so the pixel at (0, 0) is taken as the reference background color and every
// pixel whose RGB channels match it exactly becomes fully transparent. No
// tolerance, no flood fill, no morphology. Anything smarter belongs upstream
// in the model that produced the image, not here where exact reproduction is
// the contract.

use crate::core_modules::raster::Raster;
use crate::core_modules::utils::color;

/// Produces a copy of `source` in which every pixel matching the RGB channels
/// of the (0, 0) corner pixel is fully transparent. All other pixels are
/// copied unchanged, including their original alpha. The source raster is not
/// modified.
///
/// Callers that already have transparency in the source (any pixel with
/// alpha 0) should skip this stage entirely; that policy lives in the
/// pipeline, not here.
pub fn isolate_background(source: &Raster) -> Raster {
    let Some(reference) = source.get(0, 0) else {
        // Zero-dimension input: nothing to isolate.
        return source.clone();
    };
    let background_rgb = color::rgb(reference);
    tracing::debug!("isolating background, corner reference {background_rgb:06X}");

    let mut cleared = 0usize;
    let pixels = source
        .pixels()
        .iter()
        .map(|&argb| {
            if color::rgb(argb) == background_rgb {
                cleared += 1;
                color::TRANSPARENT
            } else {
                argb
            }
        })
        .collect();

    tracing::debug!(cleared, "background isolation complete");
    Raster::from_pixels(source.width(), source.height(), pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_pixels_become_transparent() {
        let mut source = Raster::new(3, 1);
        source.set(0, 0, 0xFF102030);
        source.set(1, 0, 0xFFFF0000);
        source.set(2, 0, 0x80102030); // same RGB, different alpha: still background

        let result = isolate_background(&source);
        assert_eq!(result.get(0, 0), Some(0x00000000));
        assert_eq!(result.get(1, 0), Some(0xFFFF0000));
        assert_eq!(result.get(2, 0), Some(0x00000000));
    }

    #[test]
    fn foreground_alpha_is_preserved() {
        let mut source = Raster::new(2, 1);
        source.set(0, 0, 0xFFFFFFFF);
        source.set(1, 0, 0x7711AA33);

        let result = isolate_background(&source);
        assert_eq!(result.get(1, 0), Some(0x7711AA33));
    }

    #[test]
    fn no_reference_match_is_identity() {
        let mut source = Raster::new(2, 2);
        source.set(0, 0, 0xFF010101);
        source.set(1, 0, 0xFF020202);
        source.set(0, 1, 0xFF030303);
        source.set(1, 1, 0xFF040404);

        // The corner color itself occurs once; a raster where the remaining
        // pixels never repeat it keeps them all.
        let result = isolate_background(&source);
        assert_eq!(result.get(0, 0), Some(0x00000000));
        assert_eq!(result.get(1, 0), Some(0xFF020202));
        assert_eq!(result.get(0, 1), Some(0xFF030303));
        assert_eq!(result.get(1, 1), Some(0xFF040404));
    }

    #[test]
    fn transparent_black_corner_is_full_identity() {
        // The corner reference is RGB 000000 and already transparent, and no
        // other pixel carries black RGB channels, so nothing changes at all.
        let mut source = Raster::new(2, 1);
        source.set(0, 0, 0x00000000);
        source.set(1, 0, 0xFF334455);

        let result = isolate_background(&source);
        assert_eq!(result, source);
    }

    #[test]
    fn source_raster_is_untouched() {
        let mut source = Raster::new(1, 1);
        source.set(0, 0, 0xFFABCDEF);
        let _ = isolate_background(&source);
        assert_eq!(source.get(0, 0), Some(0xFFABCDEF));
    }

    #[test]
    fn zero_dimension_input_yields_empty_clone() {
        let source = Raster::new(0, 0);
        let result = isolate_background(&source);
        assert!(result.is_empty());
    }
}
