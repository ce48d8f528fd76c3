pub mod config;
pub mod errors;
pub mod model;
pub mod pipeline;
pub mod postprocess;
pub mod tensor;
pub mod traits;

pub mod mocks;

use image::{DynamicImage, ImageFormat};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use walkdir::WalkDir;

pub use config::Config;
pub use errors::{IdentError, Result};
pub use model::{ClassificationModel, SegmentationModel};
pub use pipeline::{Identification, Identifier, PipelineOptions};
pub use postprocess::{apply_mask, compute_mask, estimate_color};
pub use tensor::{RawOutputTensor, TensorShape};
pub use traits::*;

/// Shown for a photo whose pipeline failed.
pub const UNIDENTIFIED: &str = "Object could not be identified!";

/// Outcome counts of a directory run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub identified: usize,
    pub failed: usize,
}

pub struct ImageProcessor<S: SegmentationBackend, C: ClassificationBackend> {
    identifier: Identifier<S, C>,
    config: Config,
}

impl<S: SegmentationBackend, C: ClassificationBackend> ImageProcessor<S, C> {
    pub fn new(segmenter: S, classifier: C, config: Config) -> Self {
        let identifier = Identifier::new(segmenter, classifier, config.pipeline_options());
        Self { identifier, config }
    }

    /// Identifies every supported photo under the input directory.
    ///
    /// A failing photo is reported and counted; it never stops the batch.
    pub fn process_directory(&self) -> Result<ProcessSummary> {
        let input_path = &self.config.input_dir;
        let output_path = &self.config.output_dir;

        if !input_path.exists() {
            return Err(IdentError::FileSystem {
                path: input_path.clone(),
                operation: "input directory check".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "input directory does not exist",
                ),
            });
        }

        fs::create_dir_all(output_path).map_err(|e| IdentError::FileSystem {
            path: output_path.clone(),
            operation: "output directory creation".to_string(),
            source: e,
        })?;

        let image_files = self.collect_image_files(input_path);

        if image_files.is_empty() {
            tracing::warn!("No images found under {}", input_path.display());
            return Ok(ProcessSummary::default());
        }

        let pb = ProgressBar::new(image_files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                )
                .map_err(|e| IdentError::Configuration {
                    message: e.to_string(),
                })?
                .progress_chars("#>-"),
        );

        let failed = AtomicUsize::new(0);
        image_files
            .par_iter()
            .progress_with(pb.clone())
            .for_each(|input_file| match self.process_single_image(input_file, output_path) {
                Ok(identification) => pb.println(format!(
                    "{}: {} ({:.2}), colour {}",
                    input_file.display(),
                    identification.label,
                    identification.categories.first().map_or(0.0, |c| c.score),
                    identification.color().to_hex()
                )),
                Err(e) => {
                    failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("{}: {e}", input_file.display());
                    pb.println(format!("{}: {UNIDENTIFIED}", input_file.display()));
                }
            });

        pb.finish_and_clear();
        let failed = failed.into_inner();
        let summary = ProcessSummary {
            identified: image_files.len() - failed,
            failed,
        };
        tracing::info!(
            "Processed {} images: {} identified, {} failed",
            image_files.len(),
            summary.identified,
            summary.failed
        );
        Ok(summary)
    }

    fn collect_image_files(&self, input_path: &Path) -> Vec<PathBuf> {
        WalkDir::new(input_path)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|path| path.is_file() && self.is_supported_image_format(path))
            .collect()
    }

    pub fn is_supported_image_format(&self, path: &Path) -> bool {
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            matches!(
                extension.to_lowercase().as_str(),
                "jpg" | "jpeg" | "png" | "webp" | "bmp" | "gif" | "tiff" | "avif"
            )
        } else {
            false
        }
    }

    pub fn process_single_image(
        &self,
        input_file: &Path,
        output_dir: &Path,
    ) -> Result<Identification> {
        let img = image::open(input_file).map_err(|e| IdentError::ImageProcessing {
            path: input_file.display().to_string(),
            operation: "image load".to_string(),
            source: Box::new(e),
        })?;

        let identification = self.identifier.identify(&img, self.config.rotation)?;

        let relative_path = self.get_relative_path(input_file)?;
        let output_base = output_dir.join(relative_path);
        if let Some(parent) = output_base.parent() {
            fs::create_dir_all(parent).map_err(|e| IdentError::FileSystem {
                path: parent.to_path_buf(),
                operation: "output directory creation".to_string(),
                source: e,
            })?;
        }

        let segmentation = &identification.segmentation;
        let highlight =
            postprocess::highlight_mask(&segmentation.mask, self.identifier.options().highlight);
        let outputs = [
            ("mask", DynamicImage::ImageRgba8(highlight)),
            ("masked", DynamicImage::ImageRgba8(segmentation.masked.clone())),
            ("overlay", DynamicImage::ImageRgba8(segmentation.overlay.clone())),
        ];

        // a failed photo leaves nothing behind
        let mut written = Vec::with_capacity(outputs.len());
        for (suffix, image) in outputs {
            match self.save(image, &output_base, suffix) {
                Ok(path) => written.push(path),
                Err(e) => {
                    for path in &written {
                        if let Err(remove_err) = fs::remove_file(path) {
                            tracing::warn!("{}: {remove_err}", path.display());
                        }
                    }
                    return Err(e);
                }
            }
        }

        Ok(identification)
    }

    fn save(&self, image: DynamicImage, output_base: &Path, suffix: &str) -> Result<PathBuf> {
        let format = self.config.output_format();
        let output_file = self.output_file(output_base, suffix);
        // formats without alpha (jpeg) reject RGBA buffers
        let image = if format == ImageFormat::Jpeg {
            DynamicImage::ImageRgb8(image.to_rgb8())
        } else {
            image
        };

        image
            .save_with_format(&output_file, format)
            .map_err(|e| IdentError::ImageProcessing {
                path: output_file.display().to_string(),
                operation: "image save".to_string(),
                source: Box::new(e),
            })?;
        Ok(output_file)
    }

    fn output_file(&self, output_base: &Path, suffix: &str) -> PathBuf {
        let stem = output_base
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        output_base.with_file_name(format!("{stem}_{suffix}.{}", self.config.format))
    }

    pub fn get_relative_path(&self, input_file: &Path) -> Result<PathBuf> {
        let input_dir = &self.config.input_dir;
        input_file
            .strip_prefix(input_dir)
            .map(|p| p.to_path_buf())
            .map_err(|_| IdentError::FileSystem {
                path: input_file.to_path_buf(),
                operation: "relative path".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "input file is not inside the input directory",
                ),
            })
    }
}

impl ImageProcessor<SegmentationModel, ClassificationModel> {
    pub fn with_onnx_models(config: Config) -> Result<Self> {
        let labels = model::load_labels(&config.labels)?;
        let segmenter =
            SegmentationModel::new(&config.segmentation_model, &config.segmentation_runtime())?;
        let classifier = ClassificationModel::new(
            &config.classification_model,
            labels,
            &config.classification_runtime(),
        )?;
        Ok(Self::new(segmenter, classifier, config))
    }
}
