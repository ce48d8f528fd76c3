use image::{imageops, imageops::FilterType, GrayImage};

use crate::errors::{IdentError, Result};
use crate::postprocess::ClassMask;

/// Class mask at the source photo's resolution. Zero is background.
pub type ScaledMask = GrayImage;

/// Resizes a class mask to `width` x `height`.
///
/// Nearest-neighbor sampling keeps every output value one of the input class
/// indices; interpolating labels would invent classes along the boundaries.
pub fn rescale_mask(mask: &ClassMask, width: u32, height: u32) -> Result<ScaledMask> {
    if width == 0 || height == 0 {
        return Err(IdentError::validation(
            "mask size",
            format!("{width}x{height} is empty"),
        ));
    }
    if mask.dimensions() == (width, height) {
        return Ok(mask.clone());
    }

    let scaled = imageops::resize(mask, width, height, FilterType::Nearest);
    if scaled.dimensions() != (width, height) {
        return Err(IdentError::DimensionMismatch {
            expected: (width, height),
            actual: scaled.dimensions(),
        });
    }
    Ok(scaled)
}

/// Rotates a mask produced from a rotated model input back to the photo's
/// orientation. `rotation_degrees` is the same value handed to preprocessing.
pub fn undo_rotation(mask: ClassMask, rotation_degrees: i32) -> Result<ClassMask> {
    match rotation_degrees.rem_euclid(360) {
        0 => Ok(mask),
        90 => Ok(imageops::rotate270(&mask)),
        180 => Ok(imageops::rotate180(&mask)),
        270 => Ok(imageops::rotate90(&mask)),
        _ => Err(IdentError::validation(
            "rotation",
            format!("{rotation_degrees} is not a multiple of 90"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn checkerboard(width: u32, height: u32) -> ClassMask {
        ClassMask::from_fn(width, height, |x, y| Luma([((x + y) % 3) as u8]))
    }

    #[test]
    fn test_same_size_is_identity() -> Result<()> {
        let mask = checkerboard(5, 7);
        let scaled = rescale_mask(&mask, 5, 7)?;
        assert_eq!(scaled, mask);
        Ok(())
    }

    #[test]
    fn test_output_matches_requested_size() -> Result<()> {
        let mask = checkerboard(4, 4);
        for (w, h) in [(8, 8), (3, 9), (1, 1), (13, 2)] {
            assert_eq!(rescale_mask(&mask, w, h)?.dimensions(), (w, h));
        }
        Ok(())
    }

    #[test]
    fn test_no_intermediate_classes() -> Result<()> {
        let mask = ClassMask::from_fn(4, 4, |x, _| Luma([if x < 2 { 0 } else { 15 }]));
        let scaled = rescale_mask(&mask, 11, 6)?;
        assert!(scaled.pixels().all(|p| p.0[0] == 0 || p.0[0] == 15));
        assert_eq!(scaled.get_pixel(0, 0).0[0], 0);
        assert_eq!(scaled.get_pixel(10, 5).0[0], 15);
        Ok(())
    }

    #[test]
    fn test_upscale_by_integer_factor_replicates_cells() -> Result<()> {
        let mask = ClassMask::from_fn(2, 2, |x, y| Luma([u8::from(x == 0 && y == 0)]));
        let scaled = rescale_mask(&mask, 4, 4)?;
        for (x, y, pixel) in scaled.enumerate_pixels() {
            assert_eq!(pixel.0[0], u8::from(x < 2 && y < 2), "pixel ({x}, {y})");
        }
        Ok(())
    }

    #[test]
    fn test_empty_target_is_rejected() {
        let mask = checkerboard(2, 2);
        assert!(matches!(
            rescale_mask(&mask, 0, 4),
            Err(IdentError::Validation { .. })
        ));
    }

    #[test]
    fn test_undo_rotation() -> Result<()> {
        let mask = checkerboard(3, 2);
        let rotated = imageops::rotate90(&mask);
        assert_eq!(undo_rotation(rotated, 90)?, mask);
        assert_eq!(undo_rotation(mask.clone(), 0)?, mask);
        assert_eq!(undo_rotation(imageops::rotate270(&mask), -90)?, mask);
        assert!(undo_rotation(mask, 45).is_err());
        Ok(())
    }
}
