use clap::Parser;
use image::ImageFormat;
use std::path::PathBuf;

use crate::errors::{IdentError, Result};
use crate::model::{Delegate, RuntimeOptions};
use crate::pipeline::{PipelineOptions, DEFAULT_RESULT_COUNT, DEFAULT_THRESHOLD};
use crate::postprocess::HIGHLIGHT;

#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    pub input_dir: PathBuf,

    #[arg(default_value = "output")]
    pub output_dir: PathBuf,

    /// Semantic segmentation model (NHWC input, per-class score output)
    #[arg(short, long)]
    pub segmentation_model: PathBuf,

    /// Image classification model ([1, N] score output)
    #[arg(short, long)]
    pub classification_model: PathBuf,

    /// Classifier labels, one per line, in output order
    #[arg(short, long)]
    pub labels: PathBuf,

    #[arg(short, long, default_value = "png", value_parser = check_format)]
    pub format: String,

    #[arg(long, value_enum, default_value_t = Delegate::Cpu)]
    pub delegate: Delegate,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    #[arg(long, default_value_t = 4)]
    pub segmentation_threads: usize,

    #[arg(long, default_value_t = 2)]
    pub classification_threads: usize,

    #[arg(short = 'n', long, default_value_t = DEFAULT_RESULT_COUNT)]
    pub result_count: usize,

    #[arg(short = 't', long, default_value_t = DEFAULT_THRESHOLD)]
    pub probability_threshold: f32,

    /// Sample every Nth pixel when estimating the subject color
    #[arg(long, default_value_t = 1)]
    pub color_stride: usize,

    /// Clockwise rotation applied before inference, in degrees
    #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
    pub rotation: i32,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self::parse()
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.probability_threshold) {
            return Err(IdentError::validation(
                "probability_threshold",
                format!("{} is outside [0, 1]", self.probability_threshold),
            ));
        }
        if self.result_count == 0 {
            return Err(IdentError::validation("result_count", "must be at least 1"));
        }
        if self.color_stride == 0 {
            return Err(IdentError::validation("color_stride", "must be at least 1"));
        }
        if self.rotation % 90 != 0 {
            return Err(IdentError::validation(
                "rotation",
                format!("{} is not a multiple of 90", self.rotation),
            ));
        }
        Ok(())
    }

    pub const fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            result_count: self.result_count,
            probability_threshold: self.probability_threshold,
            color_stride: self.color_stride,
            highlight: HIGHLIGHT,
        }
    }

    pub const fn segmentation_runtime(&self) -> RuntimeOptions {
        RuntimeOptions {
            delegate: self.delegate,
            device_id: self.device_id,
            threads: self.segmentation_threads,
        }
    }

    pub const fn classification_runtime(&self) -> RuntimeOptions {
        RuntimeOptions {
            delegate: self.delegate,
            device_id: self.device_id,
            threads: self.classification_threads,
        }
    }

    pub fn output_format(&self) -> ImageFormat {
        ImageFormat::from_extension(&self.format).unwrap_or(ImageFormat::Png)
    }
}

fn check_format(s: &str) -> std::result::Result<String, String> {
    let supported: Vec<_> = ImageFormat::all()
        .filter(|f| f.writing_enabled())
        .flat_map(|f| f.extensions_str())
        .map(|s| format!("`{}`", s))
        .collect();
    let supported_message = format!("Supported formats: {}", supported.join(", "));

    let format = ImageFormat::from_extension(s)
        .ok_or(format!("{} is not supported. {}", s, supported_message))?;
    if !format.writing_enabled() {
        return Err(format!("{} is not supported. {}", s, supported_message));
    }

    Ok(s.to_string())
}
