pub mod class_mask;
pub mod classification;
pub mod color;
pub mod mask;
pub mod overlay;
pub mod rescale;

pub use class_mask::{extract_class_mask, ClassMask, BACKGROUND};
pub use classification::{rank_categories, Category};
pub use color::{estimate_color, EstimatedColor, Hsv, BRIGHTNESS_BOOST};
pub use mask::{apply_mask, MaskedImage};
pub use overlay::{highlight_mask, render_overlay, HIGHLIGHT};
pub use rescale::{rescale_mask, undo_rotation, ScaledMask};

use crate::errors::Result;
use crate::tensor::RawOutputTensor;

/// Extracts the class mask from `raw` and scales it to `width` x `height`.
pub fn compute_mask(raw: &RawOutputTensor, width: u32, height: u32) -> Result<ScaledMask> {
    let class_mask = extract_class_mask(raw)?;
    rescale_mask(&class_mask, width, height)
}
