//! Source assets: a classified file under the source root.

use crate::identity::{relative_to, source_identity, AssetIdentity};
use crate::kind::MediaKind;
use std::path::{Path, PathBuf};

/// A supported file under the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAsset {
    /// Absolute (or root-joined) path of the source file
    pub path: PathBuf,
    /// Path relative to the source root, `/`-separated, not encoded
    pub relative: String,
    pub identity: AssetIdentity,
    /// Source extension as found on disk
    pub source_extension: String,
    pub kind: MediaKind,
    /// Basename contains the no-resize marker
    pub no_resize: bool,
}

impl SourceAsset {
    /// Classify `path` found under `source_root`.
    ///
    /// Returns `None` for unsupported kinds and for paths outside the root.
    pub fn classify(source_root: &Path, path: &Path, no_resize_marker: &str) -> Option<Self> {
        let relative = relative_to(source_root, path)?;
        let normalized = source_identity(&relative);
        let source_extension = normalized.extension?;

        let kind = MediaKind::from_extension(&source_extension);
        if !kind.is_supported() {
            return None;
        }

        let basename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Some(Self {
            path: path.to_path_buf(),
            relative,
            identity: normalized.identity,
            source_extension,
            kind,
            no_resize: !no_resize_marker.is_empty() && basename.contains(no_resize_marker),
        })
    }

    /// Relative name of the published artifact, e.g. `p1/PUBLIC/hero.jpg`.
    pub fn published_name(&self) -> String {
        // classify() never yields Unsupported
        let extension = self.kind.published_extension().unwrap_or_default();
        self.identity.published_name(extension)
    }

    /// Location of the published artifact under `output_root`.
    pub fn output_path(&self, output_root: &Path) -> PathBuf {
        self.published_name()
            .split('/')
            .fold(output_root.to_path_buf(), |path, segment| path.join(segment))
    }
}
