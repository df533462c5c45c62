//! Media kind classification by source extension.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Source extensions accepted by the pipeline, lowercase.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "tiff", "bmp", "ico", "webp", "mp4", "gif", "md",
];

/// Closed set of asset kinds. Classification happens once per asset and the
/// kind drives transcode dispatch and the published extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Document,
    Unsupported,
}

impl MediaKind {
    /// Classify a source extension (with or without the dot, any case).
    pub fn from_extension(extension: &str) -> Self {
        match extension
            .trim_start_matches('.')
            .to_ascii_lowercase()
            .as_str()
        {
            "png" | "jpg" | "jpeg" | "tiff" | "bmp" | "ico" | "webp" => MediaKind::Image,
            "mp4" | "gif" => MediaKind::Video,
            "md" => MediaKind::Document,
            _ => MediaKind::Unsupported,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(MediaKind::Unsupported)
    }

    /// Extension of the published artifact, without the dot.
    pub fn published_extension(&self) -> Option<&'static str> {
        match self {
            MediaKind::Image => Some("jpg"),
            MediaKind::Video => Some("mp4"),
            MediaKind::Document => Some("md"),
            MediaKind::Unsupported => None,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, MediaKind::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(MediaKind::from_extension("PNG"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension(".JpEg"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("GIF"), MediaKind::Video);
        assert_eq!(MediaKind::from_extension("md"), MediaKind::Document);
        assert_eq!(MediaKind::from_extension("mov"), MediaKind::Unsupported);
        assert_eq!(MediaKind::from_extension(""), MediaKind::Unsupported);
    }

    #[test]
    fn test_every_supported_extension_classifies() {
        for ext in SUPPORTED_EXTENSIONS {
            assert!(MediaKind::from_extension(ext).is_supported(), "{}", ext);
        }
    }

    #[test]
    fn test_published_extensions() {
        assert_eq!(MediaKind::Image.published_extension(), Some("jpg"));
        assert_eq!(MediaKind::Video.published_extension(), Some("mp4"));
        assert_eq!(MediaKind::Document.published_extension(), Some("md"));
        assert_eq!(MediaKind::Unsupported.published_extension(), None);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(MediaKind::from_path(Path::new("a/b/clip.Gif")), MediaKind::Video);
        assert_eq!(MediaKind::from_path(Path::new("a/README")), MediaKind::Unsupported);
    }
}
