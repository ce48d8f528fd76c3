use crate::errors::Result;
use crate::tensor::{RawOutputTensor, TensorShape};
use ndarray::prelude::*;

/// Segmentation model as seen by the pipeline.
///
/// Implementations own the runtime session and must serialize calls into it;
/// the pipeline never assumes the runtime is reentrant.
pub trait SegmentationBackend: Send + Sync {
    /// NHWC input the model expects, batch dimension excluded.
    fn input_shape(&self) -> TensorShape;

    /// Shape of the per-pixel class scores, known before any inference.
    fn output_shape(&self) -> TensorShape;

    /// Runs the model on a preprocessed `[1, H, W, C]` tensor.
    fn run_inference(&self, input: ArrayView4<f32>) -> Result<RawOutputTensor>;
}

/// Image classifier as seen by the pipeline.
pub trait ClassificationBackend: Send + Sync {
    fn input_shape(&self) -> TensorShape;

    /// Labels in the order of the model's output scores.
    fn labels(&self) -> &[String];

    /// Runs the model and returns one confidence per label.
    fn run_inference(&self, input: ArrayView4<f32>) -> Result<Vec<f32>>;
}
