use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

use crate::errors::{IdentError, Result};
use crate::model::preprocess;
use crate::postprocess::{
    apply_mask, estimate_color, extract_class_mask, highlight_mask, rank_categories,
    render_overlay, rescale_mask, undo_rotation, Category, EstimatedColor, MaskedImage,
    ScaledMask, HIGHLIGHT,
};
use crate::traits::{ClassificationBackend, SegmentationBackend};

pub const DEFAULT_RESULT_COUNT: usize = 3;
pub const DEFAULT_THRESHOLD: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    pub result_count: usize,
    pub probability_threshold: f32,
    /// Sample every Nth pixel when estimating the color.
    pub color_stride: usize,
    pub highlight: Rgba<u8>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            result_count: DEFAULT_RESULT_COUNT,
            probability_threshold: DEFAULT_THRESHOLD,
            color_stride: 1,
            highlight: HIGHLIGHT,
        }
    }
}

/// Segmentation half of an identification.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub mask: ScaledMask,
    pub masked: MaskedImage,
    pub color: EstimatedColor,
    pub overlay: RgbaImage,
}

/// Combined result for one photo.
#[derive(Debug, Clone)]
pub struct Identification {
    pub label: String,
    pub categories: Vec<Category>,
    pub segmentation: Segmentation,
}

impl Identification {
    pub fn color(&self) -> &EstimatedColor {
        &self.segmentation.color
    }
}

/// Owns both model handles for the lifetime of a run.
///
/// Every call works on its own buffers; the only shared state is the model
/// sessions, which serialize access themselves.
pub struct Identifier<S, C> {
    segmenter: S,
    classifier: C,
    options: PipelineOptions,
}

impl<S, C> Identifier<S, C>
where
    S: SegmentationBackend,
    C: ClassificationBackend,
{
    pub const fn new(segmenter: S, classifier: C, options: PipelineOptions) -> Self {
        Self {
            segmenter,
            classifier,
            options,
        }
    }

    pub const fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Classifies and segments `image` in parallel and joins the results.
    ///
    /// Either half failing fails the whole call; no partial result is returned.
    pub fn identify(&self, image: &DynamicImage, rotation_degrees: i32) -> Result<Identification> {
        let _span = tracing::debug_span!("identify").entered();

        let (categories, segmentation) = rayon::join(
            || self.classify(image, rotation_degrees),
            || self.segment(image, rotation_degrees),
        );
        let categories = categories?;
        let segmentation = segmentation?;

        let label = categories
            .first()
            .map(|category| category.label.clone())
            .ok_or_else(|| IdentError::InferenceUnavailable {
                operation: "classification".to_string(),
                source: "no labels found".into(),
            })?;

        Ok(Identification {
            label,
            categories,
            segmentation,
        })
    }

    pub fn classify(&self, image: &DynamicImage, rotation_degrees: i32) -> Result<Vec<Category>> {
        let input = preprocess(
            &image.to_rgb8(),
            self.classifier.input_shape(),
            rotation_degrees,
        )?;
        let scores = self.classifier.run_inference(input.view())?;
        rank_categories(
            &scores,
            self.classifier.labels(),
            self.options.probability_threshold,
            self.options.result_count,
        )
    }

    pub fn segment(&self, image: &DynamicImage, rotation_degrees: i32) -> Result<Segmentation> {
        let input = preprocess(
            &image.to_rgb8(),
            self.segmenter.input_shape(),
            rotation_degrees,
        )?;
        let raw = self.segmenter.run_inference(input.view())?;
        if raw.shape() != self.segmenter.output_shape() {
            return Err(IdentError::invalid_shape(format!(
                "segmenter declared {:?} but produced {:?}",
                self.segmenter.output_shape(),
                raw.shape()
            )));
        }

        let class_mask = undo_rotation(extract_class_mask(&raw)?, rotation_degrees)?;
        let (width, height) = image.dimensions();
        let mask = rescale_mask(&class_mask, width, height)?;

        let source = image.to_rgba8();
        let masked = apply_mask(&source, &mask)?;
        let color = estimate_color(&masked, self.options.color_stride)?;
        tracing::debug!("inferred colour: {}", color.mean_hex());
        tracing::debug!("improved colour: {}", color.to_hex());

        let overlay = render_overlay(&source, &highlight_mask(&mask, self.options.highlight))?;

        Ok(Segmentation {
            mask,
            masked,
            color,
            overlay,
        })
    }
}
