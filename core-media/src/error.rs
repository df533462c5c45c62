use std::path::PathBuf;
use thiserror::Error;

/// Failures of a single asset's classification or transcode.
///
/// All of these are scoped to one asset; the reconciler records them and
/// moves on.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Failed to read source {path}: {message}")]
    SourceRead { path: PathBuf, message: String },

    #[error("Transcode failed for {path}: {message}")]
    Transcode { path: PathBuf, message: String },

    #[error("Unsupported media kind: {0}")]
    UnsupportedKind(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl MediaError {
    pub(crate) fn transcode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        MediaError::Transcode {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn source_read(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        MediaError::SourceRead {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
