use anyhow::{ensure, Context, Result};
use clap::Parser;

use ident_seg_rs::{Config, ImageProcessor};

fn main() -> Result<()> {
    let config = Config::parse();

    let level = if config.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    config.validate()?;
    ensure!(
        config.segmentation_model.exists(),
        "Segmentation model path does not exist"
    );
    ensure!(
        config.classification_model.exists(),
        "Classification model path does not exist"
    );
    ensure!(config.labels.exists(), "Labels file does not exist");
    ensure!(config.input_dir.exists(), "Input directory does not exist");

    let processor =
        ImageProcessor::with_onnx_models(config).context("Failed to load the models")?;
    let summary = processor.process_directory()?;

    ensure!(
        summary.failed == 0 || summary.identified > 0,
        "No image could be identified"
    );
    Ok(())
}
