use image::{GenericImageView, Rgb, Rgba};

use crate::errors::{IdentError, Result};

/// Added to the HSV value of the mean color. Averaging over a subject's
/// shading darkens it; this brings it back toward what the eye reports.
pub const BRIGHTNESS_BOOST: f32 = 0.15;

/// Hue in degrees `[0, 360)`, saturation and value in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
}

impl Hsv {
    pub fn from_rgb(Rgb([red, green, blue]): Rgb<u8>) -> Self {
        let max = red.max(green).max(blue);
        let min = red.min(green).min(blue);
        let delta = f32::from(max - min);
        let value = f32::from(max) / 255.0;

        if max == min {
            return Self {
                hue: 0.0,
                saturation: 0.0,
                value,
            };
        }

        let (r, g, b) = (f32::from(red), f32::from(green), f32::from(blue));
        let sector = if red == max {
            (g - b) / delta
        } else if green == max {
            2.0 + (b - r) / delta
        } else {
            4.0 + (r - g) / delta
        };
        let mut hue = sector * 60.0;
        if hue < 0.0 {
            hue += 360.0;
        }

        Self {
            hue,
            saturation: delta / f32::from(max),
            value,
        }
    }

    pub fn to_rgb(self) -> Rgb<u8> {
        let saturation = self.saturation.clamp(0.0, 1.0);
        let value = self.value.clamp(0.0, 1.0) * 255.0;
        let byte = |v: f32| v.round() as u8;

        if saturation <= f32::EPSILON {
            let v = byte(value);
            return Rgb([v, v, v]);
        }

        let sector = if (0.0..360.0).contains(&self.hue) {
            self.hue / 60.0
        } else {
            0.0
        };
        let whole = sector.floor();
        let fraction = sector - whole;

        let v = byte(value);
        let p = byte((1.0 - saturation) * value);
        let q = byte((1.0 - saturation * fraction) * value);
        let t = byte((1.0 - saturation * (1.0 - fraction)) * value);

        match whole as u8 {
            0 => Rgb([v, t, p]),
            1 => Rgb([q, v, p]),
            2 => Rgb([p, v, t]),
            3 => Rgb([p, q, v]),
            4 => Rgb([t, p, v]),
            _ => Rgb([v, p, q]),
        }
    }

    /// Adds `amount` to the value channel, clamped to `[0, 1]`.
    pub fn brighten(self, amount: f32) -> Self {
        Self {
            value: (self.value + amount).clamp(0.0, 1.0),
            ..self
        }
    }
}

/// Representative color of the foreground of a masked photo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatedColor {
    /// Plain per-channel mean over the sampled foreground pixels.
    pub mean: Rgb<u8>,
    /// The mean after the brightness boost.
    pub rgb: Rgb<u8>,
    pub hsv: Hsv,
    pub foreground_pixels: usize,
}

impl EstimatedColor {
    pub fn to_hex(&self) -> String {
        hex(self.rgb)
    }

    pub fn mean_hex(&self) -> String {
        hex(self.mean)
    }
}

fn hex(Rgb([r, g, b]): Rgb<u8>) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Averages the color of the non-zero pixels of `masked`, sampling every
/// `stride`-th pixel in row-major order, then applies [`BRIGHTNESS_BOOST`].
///
/// A pixel counts as foreground when any channel, alpha included, is non-zero;
/// the masking compositor zeroes background pixels entirely.
pub fn estimate_color<I>(masked: &I, stride: usize) -> Result<EstimatedColor>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    if stride == 0 {
        return Err(IdentError::validation("stride", "must be at least 1"));
    }

    let mut sums = [0u64; 3];
    let mut count = 0u64;
    for (_, _, pixel) in masked.pixels().step_by(stride) {
        if pixel.0 == [0; 4] {
            continue;
        }
        let Rgba([red, green, blue, _]) = pixel;
        sums[0] += u64::from(red);
        sums[1] += u64::from(green);
        sums[2] += u64::from(blue);
        count += 1;
    }

    if count == 0 {
        return Err(IdentError::EmptyForegroundRegion);
    }

    // each mean is at most 255
    let mean = Rgb(sums.map(|sum| (sum / count) as u8));
    let hsv = Hsv::from_rgb(mean).brighten(BRIGHTNESS_BOOST);

    Ok(EstimatedColor {
        mean,
        rgb: hsv.to_rgb(),
        hsv,
        foreground_pixels: count as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn test_uniform_color_any_stride() -> Result<()> {
        let image = RgbaImage::from_pixel(7, 5, Rgba([100, 50, 25, 255]));
        for stride in [1, 2, 3, 8, 34, 35, 1000] {
            let color = estimate_color(&image, stride)?;
            assert_eq!(color.mean, Rgb([100, 50, 25]), "stride {stride}");
            assert_eq!(color.rgb, Rgb([138, 69, 35]), "stride {stride}");
        }
        Ok(())
    }

    #[test]
    fn test_value_is_clamped() -> Result<()> {
        let image = RgbaImage::from_pixel(3, 3, Rgba([255, 0, 0, 255]));
        let color = estimate_color(&image, 1)?;
        assert_eq!(color.rgb, Rgb([255, 0, 0]));
        assert_eq!(color.hsv.value, 1.0);
        assert_eq!(color.to_hex(), "#ff0000");
        Ok(())
    }

    #[test]
    fn test_gray_gets_brighter() -> Result<()> {
        let image = RgbaImage::from_pixel(2, 2, Rgba([100, 100, 100, 255]));
        let color = estimate_color(&image, 1)?;
        // 100 / 255 + 0.15 = 0.5422 -> 138.25
        assert_eq!(color.rgb, Rgb([138, 138, 138]));
        assert_eq!(color.hsv.saturation, 0.0);
        Ok(())
    }

    #[test]
    fn test_background_is_ignored() -> Result<()> {
        let image = RgbaImage::from_fn(4, 4, |x, _| {
            if x == 0 {
                Rgba([40, 80, 120, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        let color = estimate_color(&image, 1)?;
        assert_eq!(color.foreground_pixels, 4);
        assert_eq!(color.mean, Rgb([40, 80, 120]));
        Ok(())
    }

    #[test]
    fn test_opaque_black_is_foreground() -> Result<()> {
        let image = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        let color = estimate_color(&image, 1)?;
        assert_eq!(color.foreground_pixels, 2);
        assert_eq!(color.mean, Rgb([0, 0, 0]));
        // 0 + 0.15 -> 38.25
        assert_eq!(color.rgb, Rgb([38, 38, 38]));
        Ok(())
    }

    #[test]
    fn test_mean_truncates() -> Result<()> {
        let image = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([10, 0, 0, 255])
            } else {
                Rgba([13, 0, 0, 255])
            }
        });
        let color = estimate_color(&image, 1)?;
        assert_eq!(color.mean, Rgb([11, 0, 0]));
        Ok(())
    }

    #[test]
    fn test_all_background_is_an_error() {
        let image = RgbaImage::new(4, 4);
        assert!(matches!(
            estimate_color(&image, 1),
            Err(IdentError::EmptyForegroundRegion)
        ));
    }

    #[test]
    fn test_zero_stride_is_rejected() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([1, 1, 1, 1]));
        assert!(matches!(
            estimate_color(&image, 0),
            Err(IdentError::Validation { .. })
        ));
    }

    #[test]
    fn test_hsv_round_trip_primaries() {
        for rgb in [
            Rgb([255, 0, 0]),
            Rgb([0, 255, 0]),
            Rgb([0, 0, 255]),
            Rgb([255, 255, 0]),
            Rgb([0, 255, 255]),
            Rgb([255, 0, 255]),
            Rgb([12, 200, 99]),
        ] {
            assert_eq!(Hsv::from_rgb(rgb).to_rgb(), rgb);
        }
    }

    #[test]
    fn test_hue_of_primaries() {
        assert_eq!(Hsv::from_rgb(Rgb([255, 0, 0])).hue, 0.0);
        assert_eq!(Hsv::from_rgb(Rgb([0, 255, 0])).hue, 120.0);
        assert_eq!(Hsv::from_rgb(Rgb([0, 0, 255])).hue, 240.0);
        assert_eq!(Hsv::from_rgb(Rgb([255, 0, 255])).hue, 300.0);
    }
}
