//! # Identity Normalizer
//!
//! Maps store-relative paths from the three stores (source tree, local
//! published tree, remote object names) onto one canonical [`AssetIdentity`].
//!
//! Rules:
//! - separators are unified to `/`; empty and `.` segments are dropped
//! - whitespace becomes `_`, applied only to source paths on the way in;
//!   published names already carry the encoded form and are never decoded
//! - case is preserved
//! - the final extension of the last segment is split off and tracked in
//!   [`AssetPath::extension`]
//!
//! The encoding is lossy: `a b.jpg` and `a_b.jpg` share an identity. Callers
//! resolve such collisions (first one wins).

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::path::{Component, Path};

/// Canonical, extension-less key shared by a source asset, its published
/// artifact and its remote object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetIdentity(String);

impl AssetIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Published object name for this identity: `<identity>.<ext>`.
    pub fn published_name(&self, extension: &str) -> String {
        let extension = extension.trim_start_matches('.');
        if extension.is_empty() {
            self.0.clone()
        } else {
            format!("{}.{}", self.0, extension)
        }
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AssetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for AssetIdentity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A normalized path: identity plus the extension that was split off.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetPath {
    pub identity: AssetIdentity,
    /// Extension without the dot, case preserved
    pub extension: Option<String>,
}

/// Unify separators to `/` and drop empty and `.` segments.
pub fn normalize_separators(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Replace every whitespace character with `_`.
pub fn encode_whitespace(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Split the final extension off the last segment of a normalized name.
///
/// A leading dot (`.hidden`) or a trailing dot (`name.`) is not an extension.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    let segment_start = name.rfind('/').map(|i| i + 1).unwrap_or(0);
    let last = &name[segment_start..];

    match last.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < last.len() => {
            let split = segment_start + dot;
            (&name[..split], Some(&name[split + 1..]))
        }
        _ => (name, None),
    }
}

fn to_asset_path(normalized: &str) -> AssetPath {
    let (stem, extension) = split_extension(normalized);
    AssetPath {
        identity: AssetIdentity(stem.to_string()),
        extension: extension.map(str::to_string),
    }
}

/// Identity of a path relative to the source root (whitespace encoded).
pub fn source_identity(relative_source_path: &str) -> AssetPath {
    to_asset_path(&encode_whitespace(&normalize_separators(
        relative_source_path,
    )))
}

/// Identity of a local published path or remote object name.
pub fn published_identity(relative_published_name: &str) -> AssetPath {
    to_asset_path(&normalize_separators(relative_published_name))
}

/// Store-relative, `/`-separated form of `path` below `root`.
///
/// Returns `None` when `path` is not under `root`.
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_normalize_separators() {
        assert_eq!(normalize_separators("a\\b\\c.png"), "a/b/c.png");
        assert_eq!(normalize_separators("./a//b/./c.png"), "a/b/c.png");
        assert_eq!(normalize_separators("/abs/x.md"), "abs/x.md");
        assert_eq!(normalize_separators(""), "");
    }

    #[test]
    fn test_source_identity_encodes_whitespace() {
        let path = source_identity("Project One/PUBLIC/hero shot.PNG");
        assert_eq!(path.identity.as_str(), "Project_One/PUBLIC/hero_shot");
        assert_eq!(path.extension.as_deref(), Some("PNG"));
    }

    #[test]
    fn test_published_identity_never_decodes() {
        let path = published_identity("Project_One/PUBLIC/hero_shot.jpg");
        assert_eq!(path.identity.as_str(), "Project_One/PUBLIC/hero_shot");
        assert_eq!(path.extension.as_deref(), Some("jpg"));
    }

    #[test]
    fn test_three_stores_agree() {
        let source = source_identity("p1\\PUBLIC\\NR=wide banner.png");
        let published = source.identity.published_name("jpg");
        assert_eq!(published, "p1/PUBLIC/NR=wide_banner.jpg");
        assert_eq!(published_identity(&published).identity, source.identity);
    }

    #[test]
    fn test_split_extension_edge_cases() {
        assert_eq!(split_extension("a/b.tar.gz"), ("a/b.tar", Some("gz")));
        assert_eq!(split_extension("a/.hidden"), ("a/.hidden", None));
        assert_eq!(split_extension("a.dir/noext"), ("a.dir/noext", None));
        assert_eq!(split_extension("trailing."), ("trailing.", None));
    }

    #[test]
    fn test_collisions_share_identity() {
        assert_eq!(
            source_identity("p/a b.jpg").identity,
            source_identity("p/a_b.jpg").identity
        );
        assert_eq!(
            source_identity("p/x.png").identity,
            source_identity("p/x.jpg").identity
        );
    }

    #[test]
    fn test_relative_to() {
        let root = PathBuf::from("/srv/content");
        assert_eq!(
            relative_to(&root, &root.join("p1").join("PUBLIC").join("a.png")),
            Some("p1/PUBLIC/a.png".to_string())
        );
        assert_eq!(relative_to(&root, Path::new("/elsewhere/a.png")), None);
        assert_eq!(relative_to(&root, &root), None);
    }

    #[test]
    fn test_published_name_accepts_dotted_extension() {
        let identity = source_identity("a/b.gif").identity;
        assert_eq!(identity.published_name(".mp4"), "a/b.mp4");
        assert_eq!(identity.published_name("mp4"), "a/b.mp4");
    }
}
