//! Storage Abstractions
//!
//! Provides platform-agnostic traits for local file I/O and for the remote
//! object store the pipeline publishes into.

use async_trait::async_trait;
use bytes::Bytes;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// Abstracts file I/O so the reconciliation engine can run against the real
/// filesystem on desktop and against in-memory fakes in tests.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn save_index(fs: &dyn FileSystemAccess, data: &[u8]) -> Result<()> {
///     fs.write_file_atomic(Path::new("hashed_mirror.json"), data.to_vec().into()).await
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, creating it (and its parents) if it doesn't exist
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Rename a file, replacing the destination if it exists
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// List all entries in a directory
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Replace a file's contents without ever exposing a truncated file.
    ///
    /// Writes a sibling `<name>.tmp` and renames it over the target.
    async fn write_file_atomic(&self, path: &Path, data: Bytes) -> Result<()> {
        let mut tmp_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        self.write_file(&tmp_path, data).await?;
        self.rename(&tmp_path, path).await
    }

    /// Recursively list every regular file below `root`, sorted by path.
    ///
    /// A missing root yields an empty list.
    async fn walk_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !self.exists(root).await? {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            for entry in self.list_directory(&dir).await? {
                if self.metadata(&entry).await?.is_directory {
                    pending.push(entry);
                } else {
                    files.push(entry);
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

/// Content digest algorithm a remote store reports for its objects.
///
/// The remote syncer hashes local artifacts with the same algorithm so the
/// two sides can be compared directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    /// Lowercase hex digest of `data`
    pub fn hex_digest(&self, data: &[u8]) -> String {
        match self {
            DigestAlgorithm::Sha1 => hex::encode(Sha1::digest(data)),
            DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
        }
    }
}

/// An object held by the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Provider-specific version/file id, needed for deletion
    pub id: String,
    /// Object name (the published relative path, `/`-separated)
    pub name: String,
    /// Content digest reported by the provider, if it reports one
    pub content_hash: Option<String>,
    /// Size in bytes, when known
    pub size: Option<u64>,
}

/// Remote object store protocol
///
/// The reconciliation engine depends only on this contract, never on a
/// specific provider's API shape.
///
/// Errors:
/// - [`BridgeError::Unauthorized`](crate::error::BridgeError::Unauthorized)
///   when credentials are rejected; callers abort the whole pass.
/// - Any other error is scoped to the single call.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every current object in the store
    async fn list(&self) -> Result<Vec<RemoteObject>>;

    /// Upload a local file under `name`, replacing nothing
    async fn upload(&self, local_path: &Path, name: &str) -> Result<RemoteObject>;

    /// Delete the object version identified by `id` / `name`
    async fn delete(&self, id: &str, name: &str) -> Result<()>;

    /// Digest algorithm used for [`RemoteObject::content_hash`]
    fn digest_algorithm(&self) -> DigestAlgorithm;
}
