use image::{GrayImage, Luma};

use crate::errors::{IdentError, Result};
use crate::tensor::RawOutputTensor;

/// Class index reserved for background.
pub const BACKGROUND: u8 = 0;

/// One class index per pixel at the model's output resolution.
pub type ClassMask = GrayImage;

/// Reduces every pixel's score vector to the index of its highest score.
///
/// Scores are compared raw; argmax does not change under softmax. On ties the
/// lowest class index wins, which is what a left-to-right scan with a strict
/// comparison gives.
pub fn extract_class_mask(raw: &RawOutputTensor) -> Result<ClassMask> {
    let shape = raw.shape();
    let width = u32::try_from(shape.width)
        .map_err(|_| IdentError::invalid_shape("mask width does not fit in u32"))?;
    let height = u32::try_from(shape.height)
        .map_err(|_| IdentError::invalid_shape("mask height does not fit in u32"))?;

    let scores = raw.scores();
    Ok(ClassMask::from_fn(width, height, |x, y| {
        let pixel = scores.slice(ndarray::s![y as usize, x as usize, ..]);
        Luma([argmax(pixel.iter().copied())])
    }))
}

fn argmax(scores: impl Iterator<Item = f32>) -> u8 {
    let mut best_index = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (index, value) in scores.enumerate() {
        if index == 0 || value > best_value {
            best_index = index;
            best_value = value;
        }
    }
    // RawOutputTensor caps channels at 256
    best_index as u8
}
