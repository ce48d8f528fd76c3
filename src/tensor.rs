use ndarray::prelude::*;

use crate::errors::{IdentError, Result};

/// Logical (height, width, channels) shape of an NHWC tensor with batch size 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl TensorShape {
    pub const fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Number of values, or `None` if it does not fit in `usize`.
    pub fn len(&self) -> Option<usize> {
        self.height
            .checked_mul(self.width)?
            .checked_mul(self.channels)
    }

    pub const fn is_empty(&self) -> bool {
        self.height == 0 || self.width == 0 || self.channels == 0
    }

    /// Reads `[N, H, W, C]` as declared by a model. The batch may be `1` or
    /// dynamic (`-1`); dynamic spatial or channel dimensions are rejected
    /// since the pipeline needs fixed buffers.
    pub fn from_nhwc(dims: &[i64]) -> Result<Self> {
        let [batch, height, width, channels] = dims else {
            return Err(IdentError::invalid_shape(format!(
                "expected a rank-4 NHWC shape, got {dims:?}"
            )));
        };
        if !matches!(*batch, 1 | -1) {
            return Err(IdentError::invalid_shape(format!(
                "expected batch size 1 or dynamic, got {batch}"
            )));
        }
        let dim = |d: i64| {
            usize::try_from(d)
                .map_err(|_| IdentError::invalid_shape(format!("dynamic dimension in {dims:?}")))
        };
        Ok(Self::new(dim(*height)?, dim(*width)?, dim(*channels)?))
    }
}

/// Per-pixel class scores produced by the segmentation model.
///
/// Stored as an (H, W, C) array, channel fastest. Construction validates the
/// shape so the mask extractor can rely on it.
#[derive(Debug, Clone)]
pub struct RawOutputTensor {
    scores: Array3<f32>,
}

impl RawOutputTensor {
    /// Builds a tensor from a flat row-major buffer.
    pub fn new(shape: TensorShape, data: Vec<f32>) -> Result<Self> {
        validate(shape)?;
        let expected = shape.len().ok_or_else(|| {
            IdentError::invalid_shape(format!(
                "{}x{}x{} overflows the addressable size",
                shape.height, shape.width, shape.channels
            ))
        })?;
        if data.len() != expected {
            return Err(IdentError::invalid_shape(format!(
                "declared {}x{}x{} = {expected} values, buffer holds {}",
                shape.height,
                shape.width,
                shape.channels,
                data.len()
            )));
        }
        let scores = Array3::from_shape_vec((shape.height, shape.width, shape.channels), data)?;
        Ok(Self { scores })
    }

    pub fn from_array(scores: Array3<f32>) -> Result<Self> {
        let (height, width, channels) = scores.dim();
        validate(TensorShape::new(height, width, channels))?;
        Ok(Self {
            scores: scores.as_standard_layout().into_owned(),
        })
    }

    pub fn shape(&self) -> TensorShape {
        let (height, width, channels) = self.scores.dim();
        TensorShape::new(height, width, channels)
    }

    pub fn scores(&self) -> ArrayView3<'_, f32> {
        self.scores.view()
    }
}

fn validate(shape: TensorShape) -> Result<()> {
    if shape.channels == 0 {
        return Err(IdentError::invalid_shape("tensor has zero channels"));
    }
    // class indices are stored as u8
    if shape.channels > usize::from(u8::MAX) + 1 {
        return Err(IdentError::invalid_shape(format!(
            "{} channels exceed the 256 classes a mask can hold",
            shape.channels
        )));
    }
    if shape.height == 0 || shape.width == 0 {
        return Err(IdentError::invalid_shape(format!(
            "tensor has an empty spatial extent {}x{}",
            shape.width, shape.height
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_channels() {
        let result = RawOutputTensor::new(TensorShape::new(2, 2, 0), vec![]);
        assert!(matches!(result, Err(IdentError::InvalidTensorShape { .. })));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let result = RawOutputTensor::new(TensorShape::new(2, 2, 2), vec![0.0; 7]);
        assert!(matches!(result, Err(IdentError::InvalidTensorShape { .. })));
    }

    #[test]
    fn test_rejects_overflowing_shape() {
        let result = RawOutputTensor::new(TensorShape::new(usize::MAX, 2, 2), vec![0.0; 4]);
        assert!(matches!(result, Err(IdentError::InvalidTensorShape { .. })));
        assert_eq!(TensorShape::new(usize::MAX, 2, 2).len(), None);
        assert_eq!(TensorShape::new(4, 3, 2).len(), Some(24));
    }

    #[test]
    fn test_rejects_too_many_classes() {
        let result = RawOutputTensor::from_array(Array3::zeros((1, 1, 257)));
        assert!(matches!(result, Err(IdentError::InvalidTensorShape { .. })));
    }

    #[test]
    fn test_from_nhwc() -> Result<()> {
        assert_eq!(
            TensorShape::from_nhwc(&[1, 257, 257, 21])?,
            TensorShape::new(257, 257, 21)
        );
        assert_eq!(
            TensorShape::from_nhwc(&[-1, 257, 257, 21])?,
            TensorShape::new(257, 257, 21)
        );
        assert!(TensorShape::from_nhwc(&[1, -1, 257, 21]).is_err());
        assert!(TensorShape::from_nhwc(&[-1, 257, 257, -1]).is_err());
        assert!(TensorShape::from_nhwc(&[2, 257, 257, 21]).is_err());
        assert!(TensorShape::from_nhwc(&[257, 257, 21]).is_err());
        Ok(())
    }
}
