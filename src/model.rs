use std::path::Path;

use clap::ValueEnum;
use image::{imageops, imageops::FilterType, RgbImage};
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, ExecutionProviderDispatch,
    NNAPIExecutionProvider, TensorRTExecutionProvider,
};
use ort::session::Session;
use ort::value::TensorRef;
use parking_lot::Mutex;

use crate::errors::{IdentError, Result};
use crate::tensor::{RawOutputTensor, TensorShape};
use crate::traits::{ClassificationBackend, SegmentationBackend};

/// Maps 8-bit channels to `[-1, 1]`.
const NORMALIZE_MEAN: f32 = 127.5;
const NORMALIZE_STD: f32 = 127.5;

/// Hardware the runtime should execute on. Providers that are not compiled in
/// or not available fall back to the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Delegate {
    #[default]
    Cpu,
    Cuda,
    #[value(name = "tensorrt")]
    TensorRt,
    Nnapi,
}

impl Delegate {
    fn execution_providers(self, device_id: i32) -> Vec<ExecutionProviderDispatch> {
        match self {
            Self::Cpu => vec![CPUExecutionProvider::default().build()],
            Self::Cuda => vec![CUDAExecutionProvider::default()
                .with_device_id(device_id)
                .build()],
            Self::TensorRt => vec![
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ],
            Self::Nnapi => vec![NNAPIExecutionProvider::default().build()],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    pub delegate: Delegate,
    pub device_id: i32,
    pub threads: usize,
}

fn open_session(model_path: &Path, options: &RuntimeOptions) -> Result<Session> {
    tracing::info!(
        "Loading model from {} ({:?}, {} threads)",
        model_path.display(),
        options.delegate,
        options.threads
    );

    Session::builder()
        .map_err(|e| IdentError::inference("session builder init", e))?
        .with_execution_providers(options.delegate.execution_providers(options.device_id))
        .map_err(|e| IdentError::inference("execution provider setup", e))?
        .with_intra_threads(options.threads)
        .map_err(|e| IdentError::inference("thread setup", e))?
        .with_memory_pattern(true)
        .map_err(|e| IdentError::inference("memory pattern setup", e))?
        .commit_from_file(model_path)
        .map_err(|e| IdentError::inference(format!("model load: {}", model_path.display()), e))
}

fn input_dims(session: &Session) -> Result<Vec<i64>> {
    session
        .inputs
        .first()
        .and_then(|input| input.input_type.tensor_shape())
        .map(|dims| dims.to_vec())
        .ok_or_else(|| IdentError::invalid_shape("model declares no tensor input"))
}

fn output_dims(session: &Session) -> Result<(String, Vec<i64>)> {
    let output = session
        .outputs
        .first()
        .ok_or_else(|| IdentError::invalid_shape("model declares no output"))?;
    let dims = output
        .output_type
        .tensor_shape()
        .map(|dims| dims.to_vec())
        .ok_or_else(|| IdentError::invalid_shape("model output is not a tensor"))?;
    Ok((output.name.clone(), dims))
}

/// Reads N from a classifier output declared as `[1, N]` or `[-1, N]`.
fn class_count(dims: &[i64]) -> Result<usize> {
    match dims {
        [1 | -1, classes] => usize::try_from(*classes).ok(),
        _ => None,
    }
    .ok_or_else(|| {
        IdentError::invalid_shape(format!("expected a [1, N] classifier output, got {dims:?}"))
    })
}

/// Semantic segmentation model (DeepLab style: NHWC in, per-class scores out).
pub struct SegmentationModel {
    session: Mutex<Session>,
    input_shape: TensorShape,
    output_shape: TensorShape,
    output_name: String,
}

impl SegmentationModel {
    pub fn new(model_path: &Path, options: &RuntimeOptions) -> Result<Self> {
        let session = open_session(model_path, options)?;
        let input_shape = TensorShape::from_nhwc(&input_dims(&session)?)?;
        let (output_name, dims) = output_dims(&session)?;
        let output_shape = TensorShape::from_nhwc(&dims)?;

        let model = Self {
            session: Mutex::new(session),
            input_shape,
            output_shape,
            output_name,
        };

        // initialize model
        let warmup = Array4::<f32>::zeros(nhwc(input_shape));
        model.run_inference(warmup.view())?;
        tracing::debug!(
            "Segmentation model ready: input {:?}, output {:?}",
            input_shape,
            output_shape
        );

        Ok(model)
    }
}

impl SegmentationBackend for SegmentationModel {
    fn input_shape(&self) -> TensorShape {
        self.input_shape
    }

    fn output_shape(&self) -> TensorShape {
        self.output_shape
    }

    fn run_inference(&self, input: ArrayView4<f32>) -> Result<RawOutputTensor> {
        let mut binding = self.session.lock();
        let outputs = binding.run(ort::inputs![TensorRef::from_array_view(
            &input.as_standard_layout()
        )?])?;
        let scores = outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?;

        if scores.len_of(Axis(0)) != 1 {
            return Err(IdentError::invalid_shape(format!(
                "expected batch size 1, got {:?}",
                scores.shape()
            )));
        }
        let tensor = RawOutputTensor::from_array(scores.index_axis_move(Axis(0), 0).to_owned())?;
        if tensor.shape() != self.output_shape {
            return Err(IdentError::invalid_shape(format!(
                "model declared {:?} but produced {:?}",
                self.output_shape,
                tensor.shape()
            )));
        }
        Ok(tensor)
    }
}

/// Image classifier with a `[1, N]` confidence output and one label per score.
pub struct ClassificationModel {
    session: Mutex<Session>,
    input_shape: TensorShape,
    output_name: String,
    labels: Vec<String>,
}

impl ClassificationModel {
    pub fn new(model_path: &Path, labels: Vec<String>, options: &RuntimeOptions) -> Result<Self> {
        let session = open_session(model_path, options)?;
        let input_shape = TensorShape::from_nhwc(&input_dims(&session)?)?;
        let (output_name, dims) = output_dims(&session)?;

        let classes = class_count(&dims)?;
        if classes != labels.len() {
            return Err(IdentError::Configuration {
                message: format!(
                    "classifier has {classes} outputs but {} labels were given",
                    labels.len()
                ),
            });
        }

        let model = Self {
            session: Mutex::new(session),
            input_shape,
            output_name,
            labels,
        };

        // initialize model
        let warmup = Array4::<f32>::zeros(nhwc(input_shape));
        model.run_inference(warmup.view())?;
        tracing::debug!(
            "Classification model ready: input {:?}, {} labels",
            input_shape,
            model.labels.len()
        );

        Ok(model)
    }
}

impl ClassificationBackend for ClassificationModel {
    fn input_shape(&self) -> TensorShape {
        self.input_shape
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn run_inference(&self, input: ArrayView4<f32>) -> Result<Vec<f32>> {
        let mut binding = self.session.lock();
        let outputs = binding.run(ort::inputs![TensorRef::from_array_view(
            &input.as_standard_layout()
        )?])?;
        let scores = outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix2>()?;
        Ok(scores.iter().copied().collect())
    }
}

const fn nhwc(shape: TensorShape) -> (usize, usize, usize, usize) {
    (1, shape.height, shape.width, shape.channels)
}

/// Reads one label per line. Every line counts, blank ones included, so label
/// indices stay aligned with the model's outputs.
pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path).map_err(|e| IdentError::FileSystem {
        path: path.to_path_buf(),
        operation: "label file read".to_string(),
        source: e,
    })?;
    let labels: Vec<String> = contents.lines().map(str::to_string).collect();
    if labels.is_empty() {
        return Err(IdentError::Configuration {
            message: format!("label file {} is empty", path.display()),
        });
    }
    Ok(labels)
}

/// Builds the `[1, H, W, 3]` model input from a photo.
///
/// The photo is turned clockwise by `rotation_degrees`, resized bilinearly to
/// the model input and normalized to `[-1, 1]`.
pub fn preprocess(
    image: &RgbImage,
    shape: TensorShape,
    rotation_degrees: i32,
) -> Result<Array4<f32>> {
    if shape.channels != 3 {
        return Err(IdentError::invalid_shape(format!(
            "model expects {} input channels, only RGB is supported",
            shape.channels
        )));
    }
    let width = u32::try_from(shape.width)
        .map_err(|_| IdentError::invalid_shape("input width does not fit in u32"))?;
    let height = u32::try_from(shape.height)
        .map_err(|_| IdentError::invalid_shape("input height does not fit in u32"))?;

    let rotated = match rotation_degrees.rem_euclid(360) {
        0 => image.clone(),
        90 => imageops::rotate90(image),
        180 => imageops::rotate180(image),
        270 => imageops::rotate270(image),
        _ => {
            return Err(IdentError::validation(
                "rotation",
                format!("{rotation_degrees} is not a multiple of 90"),
            ))
        }
    };
    let resized = imageops::resize(&rotated, width, height, FilterType::Triangle);

    // (C, H, W) view -> (H, W, C)
    let tensor = resized
        .as_ndarray3()
        .permuted_axes([1, 2, 0])
        .mapv(|v| (f32::from(v) - NORMALIZE_MEAN) / NORMALIZE_STD)
        .insert_axis(Axis(0));
    Ok(tensor)
}
