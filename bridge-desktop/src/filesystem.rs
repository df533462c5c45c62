//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{FileMetadata, FileSystemAccess},
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

/// Tokio-based file system implementation
///
/// Provides async file I/O operations using:
/// - `tokio::fs` for async operations
/// - `walkdir` on the blocking pool for recursive tree walks
#[derive(Debug, Clone, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    /// Create a new file system accessor
    pub fn new() -> Self {
        Self
    }

    /// Convert std::io::Error to BridgeError
    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(Self::map_io_error)
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let metadata = fs::metadata(path).await.map_err(Self::map_io_error)?;

        Ok(FileMetadata {
            size: metadata.len(),
            modified_at: metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64),
            is_directory: metadata.is_dir(),
        })
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, "Created directory");
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Read file");
        Ok(Bytes::from(data))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent).await?;
            }
        }

        fs::write(path, data.as_ref())
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Wrote file");
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).await.map_err(Self::map_io_error)?;
        debug!(from = ?from, to = ?to, "Renamed file");
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Deleted file");
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(path).await.map_err(Self::map_io_error)?;

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(Self::map_io_error)?
        {
            entries.push(entry.path());
        }

        debug!(path = ?path, count = entries.len(), "Listed directory");
        Ok(entries)
    }

    async fn walk_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !self.exists(root).await? {
            return Ok(Vec::new());
        }

        let root = root.to_path_buf();
        let mut files = tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>> {
            let mut files = Vec::new();
            for entry in WalkDir::new(&root).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    BridgeError::OperationFailed(format!(
                        "Failed to walk {}: {}",
                        root.display(),
                        e
                    ))
                })?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
            Ok(files)
        })
        .await
        .map_err(|e| BridgeError::OperationFailed(format!("Walk task failed: {}", e)))??;

        files.sort();
        debug!(count = files.len(), "Walked directory tree");
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read() {
        let dir = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        let test_file = dir.path().join("nested").join("test-file.txt");

        let data = Bytes::from("Hello, World!");
        fs.write_file(&test_file, data.clone()).await.unwrap();

        let read_data = fs.read_file(&test_file).await.unwrap();
        assert_eq!(data, read_data);

        fs.delete_file(&test_file).await.unwrap();
        assert!(!fs.exists(&test_file).await.unwrap());
    }

    #[tokio::test]
    async fn test_atomic_write_replaces_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        let target = dir.path().join("hashed_mirror.json");

        fs.write_file(&target, Bytes::from("old")).await.unwrap();
        fs.write_file_atomic(&target, Bytes::from("new"))
            .await
            .unwrap();

        assert_eq!(fs.read_file(&target).await.unwrap(), Bytes::from("new"));
        assert!(!fs
            .exists(&dir.path().join("hashed_mirror.json.tmp"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_walk_files_is_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        for name in ["b.jpg", "a/z.md", "a/c/d.mp4"] {
            fs.write_file(&dir.path().join(name), Bytes::from("x"))
                .await
                .unwrap();
        }

        let files = fs.walk_files(dir.path()).await.unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            relative,
            vec![
                PathBuf::from("a/c/d.mp4"),
                PathBuf::from("a/z.md"),
                PathBuf::from("b.jpg"),
            ]
        );
    }

    #[tokio::test]
    async fn test_walk_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        let files = fs.walk_files(&dir.path().join("missing")).await.unwrap();
        assert!(files.is_empty());
    }
}
