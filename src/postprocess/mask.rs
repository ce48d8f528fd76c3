use image::{GenericImageView, ImageBuffer, Luma, Pixel, Primitive, RgbaImage};
use num_traits::Zero;

use crate::errors::{IdentError, Result};

/// Source photo with every background pixel zeroed.
pub type MaskedImage = RgbaImage;

/// Keeps the pixels of `image` whose mask value is foreground and zeroes the
/// rest, all channels including alpha.
pub fn apply_mask<I, M, P, S, SM>(image: &I, mask: &M) -> Result<ImageBuffer<P, Vec<S>>>
where
    I: GenericImageView<Pixel = P>,
    M: GenericImageView<Pixel = Luma<SM>>,
    P: Pixel<Subpixel = S>,
    S: Primitive,
    SM: Primitive,
{
    // mask and photo come from independent code paths, so check rather than assume
    if image.dimensions() != mask.dimensions() {
        return Err(IdentError::DimensionMismatch {
            expected: image.dimensions(),
            actual: mask.dimensions(),
        });
    }

    let (width, height) = image.dimensions();
    let mut masked = ImageBuffer::new(width, height);
    for ((x, y, pixel), (_, _, mask_pixel)) in image.pixels().zip(mask.pixels()) {
        let Luma([class]) = mask_pixel;
        if !class.is_zero() {
            masked.put_pixel(x, y, pixel);
        }
    }
    Ok(masked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgb, RgbImage, Rgba};

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 40) as u8, (y * 40) as u8, 200, (100 + x + y) as u8])
        })
    }

    #[test]
    fn test_background_zeroed_foreground_copied() -> Result<()> {
        let source = gradient(5, 4);
        let mask = GrayImage::from_fn(5, 4, |x, y| Luma([((x * y) % 3) as u8]));
        let masked = apply_mask(&source, &mask)?;

        for (x, y, pixel) in masked.enumerate_pixels() {
            if mask.get_pixel(x, y).0[0] == 0 {
                assert_eq!(pixel.0, [0, 0, 0, 0], "pixel ({x}, {y})");
            } else {
                assert_eq!(pixel, source.get_pixel(x, y), "pixel ({x}, {y})");
            }
        }
        Ok(())
    }

    #[test]
    fn test_alpha_is_preserved_on_foreground() -> Result<()> {
        let source = RgbaImage::from_pixel(2, 1, Rgba([10, 20, 30, 77]));
        let mask = GrayImage::from_pixel(2, 1, Luma([4]));
        let masked = apply_mask(&source, &mask)?;
        assert!(masked.pixels().all(|p| p.0 == [10, 20, 30, 77]));
        Ok(())
    }

    #[test]
    fn test_rgb_sources_are_supported() -> Result<()> {
        let source = RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]));
        let mask = GrayImage::from_fn(2, 2, |x, _| Luma([x as u8]));
        let masked = apply_mask(&source, &mask)?;
        assert_eq!(masked.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(masked.get_pixel(1, 1).0, [1, 2, 3]);
        Ok(())
    }

    #[test]
    fn test_dimension_mismatch() {
        let source = gradient(4, 4);
        let mask = GrayImage::new(4, 3);
        match apply_mask(&source, &mask) {
            Err(IdentError::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, (4, 4));
                assert_eq!(actual, (4, 3));
            }
            other => panic!("expected DimensionMismatch, got {other:?}"),
        }
    }
}
