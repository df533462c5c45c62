//! # Manifest
//!
//! Input rows come from a CSV manifest (`id,title,caption[,folder][,...]`);
//! output is a JSON array of [`ItemRecord`]s consumed by the site.

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use bridge_traits::storage::FileSystemAccess;
use bytes::Bytes;
use core_media::MediaKind;
use core_runtime::logging::strip_path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

/// Columns with a fixed meaning; never echoed through `extra`.
const RESERVED_COLUMNS: &[&str] = &[
    "id",
    "title",
    "caption",
    "folder",
    "description_path",
    "images_paths",
    "video_path",
];

/// One manifest row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManifestRow {
    pub id: String,
    pub title: String,
    pub caption: String,
    /// Source folder override; defaults to the title
    pub folder: Option<String>,
    /// Every other column, echoed into the output record
    pub extra: BTreeMap<String, String>,
}

impl ManifestRow {
    /// Name of the row's folder under the source root.
    pub fn folder_name(&self) -> &str {
        self.folder
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(&self.title)
    }
}

/// Source of manifest rows.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    async fn read_rows(&self) -> Result<Vec<ManifestRow>>;
}

/// CSV manifest with a header row. `id` and `title` columns are required.
pub struct CsvManifest {
    fs: Arc<dyn FileSystemAccess>,
    path: PathBuf,
}

impl CsvManifest {
    pub fn new(fs: Arc<dyn FileSystemAccess>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    /// Parse CSV bytes into rows.
    pub fn parse(data: &[u8]) -> Result<Vec<ManifestRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(data);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| SyncError::Manifest(format!("Failed to read header row: {}", e)))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        for required in ["id", "title"] {
            if !headers.iter().any(|h| h == required) {
                return Err(SyncError::Manifest(format!(
                    "Manifest is missing required column '{}'",
                    required
                )));
            }
        }

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                SyncError::Manifest(format!("Malformed row {}: {}", index + 2, e))
            })?;

            let mut row = ManifestRow::default();
            for (header, value) in headers.iter().zip(record.iter()) {
                let value = value.to_string();
                match header.as_str() {
                    "id" => row.id = value,
                    "title" => row.title = value,
                    "caption" => row.caption = value,
                    "folder" => row.folder = Some(value),
                    other if RESERVED_COLUMNS.contains(&other) || other.is_empty() => {}
                    other => {
                        row.extra.insert(other.to_string(), value);
                    }
                }
            }
            rows.push(row);
        }

        Ok(rows)
    }
}

#[async_trait]
impl ManifestSource for CsvManifest {
    #[instrument(skip(self), fields(path = %strip_path(&self.path)))]
    async fn read_rows(&self) -> Result<Vec<ManifestRow>> {
        let data = self.fs.read_file(&self.path).await.map_err(|e| {
            SyncError::Manifest(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        let rows = Self::parse(&data)?;
        info!(rows = rows.len(), "Read manifest");
        Ok(rows)
    }
}

/// One output record per publishable manifest row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: String,
    pub title: String,
    pub caption: String,
    pub description_path: Option<String>,
    pub images_paths: Vec<String>,
    pub video_path: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl ItemRecord {
    pub fn from_row(row: &ManifestRow) -> Self {
        Self {
            id: row.id.clone(),
            title: row.title.clone(),
            caption: row.caption.clone(),
            description_path: None,
            images_paths: Vec::new(),
            video_path: None,
            extra: row.extra.clone(),
        }
    }

    /// Record a published artifact URL.
    ///
    /// Images and videos are listed in `images_paths` in walk order; the
    /// first video also becomes `video_path`; a document becomes
    /// `description_path` (last one wins).
    pub fn push_artifact(&mut self, kind: MediaKind, url: String) {
        match kind {
            MediaKind::Image => self.images_paths.push(url),
            MediaKind::Video => {
                if self.video_path.is_none() {
                    self.video_path = Some(url.clone());
                }
                self.images_paths.push(url);
            }
            MediaKind::Document => self.description_path = Some(url),
            MediaKind::Unsupported => {}
        }
    }

    /// Rows with no media and no description are left out of the output.
    pub fn is_publishable(&self) -> bool {
        !self.images_paths.is_empty() || self.description_path.is_some()
    }
}

/// Write publishable items as a pretty-printed JSON array, atomically.
///
/// Returns the number of records written.
pub async fn write_output_manifest(
    fs: &dyn FileSystemAccess,
    path: &Path,
    items: &[ItemRecord],
) -> Result<usize> {
    let publishable: Vec<&ItemRecord> = items.iter().filter(|i| i.is_publishable()).collect();
    let data = serde_json::to_vec_pretty(&publishable)?;
    fs.write_file_atomic(path, Bytes::from(data)).await?;
    info!(path = %strip_path(path), records = publishable.len(), "Wrote output manifest");
    Ok(publishable.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\u{feff}id,title,caption,year,folder\n\
                       1,Project One,First,2021,\n\
                       2,Second,\"Quoted, caption\",2022,custom_dir\n";

    #[test]
    fn test_parse_rows() {
        let rows = CsvManifest::parse(CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].id, "1");
        assert_eq!(rows[0].folder_name(), "Project One");
        assert_eq!(rows[0].extra.get("year"), Some(&"2021".to_string()));

        assert_eq!(rows[1].caption, "Quoted, caption");
        assert_eq!(rows[1].folder_name(), "custom_dir");
    }

    #[test]
    fn test_missing_required_column() {
        let err = CsvManifest::parse(b"id,caption\n1,x\n").unwrap_err();
        assert!(matches!(err, SyncError::Manifest(msg) if msg.contains("title")));
    }

    #[test]
    fn test_push_artifact_rules() {
        let mut item = ItemRecord::from_row(&ManifestRow {
            id: "1".into(),
            title: "P".into(),
            ..Default::default()
        });
        assert!(!item.is_publishable());

        item.push_artifact(MediaKind::Image, "a.jpg".into());
        item.push_artifact(MediaKind::Video, "b.mp4".into());
        item.push_artifact(MediaKind::Video, "c.mp4".into());
        item.push_artifact(MediaKind::Document, "d.md".into());

        assert_eq!(item.images_paths, vec!["a.jpg", "b.mp4", "c.mp4"]);
        assert_eq!(item.video_path.as_deref(), Some("b.mp4"));
        assert_eq!(item.description_path.as_deref(), Some("d.md"));
        assert!(item.is_publishable());
    }

    #[test]
    fn test_description_only_is_publishable() {
        let mut item = ItemRecord::from_row(&ManifestRow::default());
        item.push_artifact(MediaKind::Document, "about.md".into());
        assert!(item.is_publishable());
    }

    #[test]
    fn test_output_shape_flattens_extra_columns() {
        let rows = CsvManifest::parse(CSV.as_bytes()).unwrap();
        let mut item = ItemRecord::from_row(&rows[0]);
        item.push_artifact(MediaKind::Image, "web_content/Project_One/PUBLIC/a.jpg".into());

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["year"], "2021");
        assert_eq!(value["video_path"], serde_json::Value::Null);
        assert_eq!(value["description_path"], serde_json::Value::Null);
        assert_eq!(
            value["images_paths"][0],
            "web_content/Project_One/PUBLIC/a.jpg"
        );
        assert!(value.get("folder").is_none());
    }
}
