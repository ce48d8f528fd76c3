use image::{Luma, Rgba, RgbaImage};

use crate::errors::{IdentError, Result};
use crate::postprocess::{ScaledMask, BACKGROUND};

/// Color drawn over foreground pixels (cyan).
pub const HIGHLIGHT: Rgba<u8> = Rgba([0, 255, 255, 255]);

/// Paints every foreground pixel of `mask` with `color`; background pixels stay
/// fully transparent.
pub fn highlight_mask(mask: &ScaledMask, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_fn(mask.width(), mask.height(), |x, y| {
        let Luma([class]) = *mask.get_pixel(x, y);
        if class == BACKGROUND {
            Rgba([0, 0, 0, 0])
        } else {
            color
        }
    })
}

/// Draws `highlight` on top of `source` with the overlay blend mode.
///
/// The blended color is mixed in by the highlight's alpha, so transparent
/// highlight pixels leave the photo untouched. The photo's alpha is kept.
pub fn render_overlay(source: &RgbaImage, highlight: &RgbaImage) -> Result<RgbaImage> {
    if source.dimensions() != highlight.dimensions() {
        return Err(IdentError::DimensionMismatch {
            expected: source.dimensions(),
            actual: highlight.dimensions(),
        });
    }

    let mut output = source.clone();
    for (base, top) in output.pixels_mut().zip(highlight.pixels()) {
        let Rgba([_, _, _, top_alpha]) = *top;
        if top_alpha == 0 {
            continue;
        }
        let alpha = f32::from(top_alpha) / 255.0;
        for channel in 0..3 {
            let b = f32::from(base.0[channel]) / 255.0;
            let s = f32::from(top.0[channel]) / 255.0;
            let blended = overlay(b, s);
            let mixed = b + (blended - b) * alpha;
            base.0[channel] = (mixed * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }
    Ok(output)
}

fn overlay(base: f32, top: f32) -> f32 {
    if base <= 0.5 {
        2.0 * base * top
    } else {
        1.0 - 2.0 * (1.0 - base) * (1.0 - top)
    }
}
