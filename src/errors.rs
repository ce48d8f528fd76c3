use std::path::PathBuf;
use thiserror::Error;

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while identifying a photo.
///
/// Post-processing stages return a specific variant rather than a fallback
/// value such as a black color or a misaligned mask.
#[derive(Error, Debug)]
pub enum IdentError {
    #[error("Invalid tensor shape: {reason}")]
    InvalidTensorShape { reason: String },

    #[error(
        "Dimension mismatch: expected {}x{}, got {}x{}",
        expected.0,
        expected.1,
        actual.0,
        actual.1
    )]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Mask selects no foreground pixels")]
    EmptyForegroundRegion,

    #[error("Inference unavailable: {operation} failed")]
    InferenceUnavailable {
        operation: String,
        #[source]
        source: BoxedError,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path})")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: BoxedError,
    },

    #[error("Validation error: {field} {reason}")]
    Validation { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, IdentError>;

impl IdentError {
    pub fn invalid_shape(reason: impl Into<String>) -> Self {
        Self::InvalidTensorShape {
            reason: reason.into(),
        }
    }

    /// Wraps a runtime failure. Accepts anything convertible into [`ort::Error`],
    /// which covers session builder errors as well as plain runtime errors.
    pub fn inference(operation: impl Into<String>, source: impl Into<ort::Error>) -> Self {
        Self::InferenceUnavailable {
            operation: operation.into(),
            source: Box::new(source.into()),
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Convert I/O errors to filesystem errors.
///
/// Code that has a path at hand should construct [`IdentError::FileSystem`]
/// directly; this is the fallback for the rest.
impl From<std::io::Error> for IdentError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

impl From<image::ImageError> for IdentError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing {
            path: "unknown".to_string(),
            operation: "image processing".to_string(),
            source: Box::new(err),
        }
    }
}

impl From<ort::Error> for IdentError {
    fn from(err: ort::Error) -> Self {
        Self::InferenceUnavailable {
            operation: "ort operation".to_string(),
            source: Box::new(err),
        }
    }
}

/// Reshaping only happens on model outputs, so a shape error means the
/// runtime returned something other than the declared tensor.
impl From<ndarray::ShapeError> for IdentError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::InvalidTensorShape {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = IdentError::DimensionMismatch {
            expected: (4, 3),
            actual: (2, 2),
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 4x3, got 2x2");
    }

    #[test]
    fn test_shape_error_becomes_invalid_tensor_shape() {
        let err: IdentError = ndarray::Array1::<f32>::zeros(6)
            .into_shape_with_order((4, 2))
            .unwrap_err()
            .into();
        assert!(matches!(err, IdentError::InvalidTensorShape { .. }));
    }
}
