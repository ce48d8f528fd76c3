use crate::errors::{IdentError, Result};
use crate::tensor::{RawOutputTensor, TensorShape};
use crate::traits::{ClassificationBackend, SegmentationBackend};
use ndarray::prelude::*;

/// Test double for the segmentation model: returns a fixed score tensor.
#[derive(Debug, Clone)]
pub struct MockSegmentationModel {
    pub input_shape: TensorShape,
    pub output: RawOutputTensor,
}

impl MockSegmentationModel {
    pub const fn new(input_shape: TensorShape, output: RawOutputTensor) -> Self {
        Self {
            input_shape,
            output,
        }
    }

    /// Square model whose output marks the top-left quadrant as class 1.
    pub fn quadrant(size: usize) -> Result<Self> {
        let half = size / 2;
        let mut data = Vec::with_capacity(size * size * 2);
        for y in 0..size {
            for x in 0..size {
                if x < half && y < half {
                    data.extend([0.1, 0.9]);
                } else {
                    data.extend([0.8, 0.2]);
                }
            }
        }
        let output = RawOutputTensor::new(TensorShape::new(size, size, 2), data)?;
        Ok(Self::new(TensorShape::new(size, size, 3), output))
    }
}

impl SegmentationBackend for MockSegmentationModel {
    fn input_shape(&self) -> TensorShape {
        self.input_shape
    }

    fn output_shape(&self) -> TensorShape {
        self.output.shape()
    }

    fn run_inference(&self, input: ArrayView4<f32>) -> Result<RawOutputTensor> {
        let expected = [
            1,
            self.input_shape.height,
            self.input_shape.width,
            self.input_shape.channels,
        ];
        if input.shape() != expected.as_slice() {
            return Err(IdentError::invalid_shape(format!(
                "mock expected {expected:?}, got {:?}",
                input.shape()
            )));
        }
        Ok(self.output.clone())
    }
}

/// Test double for the classifier: returns fixed scores.
#[derive(Debug, Clone)]
pub struct MockClassificationModel {
    pub input_shape: TensorShape,
    pub labels: Vec<String>,
    pub scores: Vec<f32>,
}

impl MockClassificationModel {
    pub fn new(labels: &[&str], scores: Vec<f32>) -> Self {
        Self {
            input_shape: TensorShape::new(8, 8, 3),
            labels: labels.iter().map(|s| s.to_string()).collect(),
            scores,
        }
    }
}

impl ClassificationBackend for MockClassificationModel {
    fn input_shape(&self) -> TensorShape {
        self.input_shape
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn run_inference(&self, _input: ArrayView4<f32>) -> Result<Vec<f32>> {
        Ok(self.scores.clone())
    }
}

/// Backend whose runtime never loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableModel;

impl UnavailableModel {
    fn error() -> IdentError {
        IdentError::InferenceUnavailable {
            operation: "mock inference".to_string(),
            source: "runtime not loaded".into(),
        }
    }
}

impl SegmentationBackend for UnavailableModel {
    fn input_shape(&self) -> TensorShape {
        TensorShape::new(4, 4, 3)
    }

    fn output_shape(&self) -> TensorShape {
        TensorShape::new(4, 4, 2)
    }

    fn run_inference(&self, _input: ArrayView4<f32>) -> Result<RawOutputTensor> {
        Err(Self::error())
    }
}

impl ClassificationBackend for UnavailableModel {
    fn input_shape(&self) -> TensorShape {
        TensorShape::new(4, 4, 3)
    }

    fn labels(&self) -> &[String] {
        &[]
    }

    fn run_inference(&self, _input: ArrayView4<f32>) -> Result<Vec<f32>> {
        Err(Self::error())
    }
}
