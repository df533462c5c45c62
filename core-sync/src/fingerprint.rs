//! # Fingerprint Store
//!
//! Durable `identity -> SHA-256 hex` index of source content that has already
//! been transcoded. It is the sole change-detection input of the local
//! reconciler.
//!
//! The store fails open: a missing document is a first run, and an unreadable
//! or corrupt document is logged and treated as empty, which costs a full
//! reprocess but never aborts a run.
//!
//! Persistence is a single JSON object with sorted keys, replaced atomically
//! (`<path>.tmp` then rename) by [`FingerprintStore::flush`].

use crate::error::{Result, SyncError};
use crate::hold::HoldSet;
use bridge_traits::storage::{DigestAlgorithm, FileSystemAccess};
use bytes::Bytes;
use core_media::AssetIdentity;
use core_runtime::logging::strip_path;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// SHA-256 hex digest of source bytes.
pub fn content_digest(data: &[u8]) -> String {
    DigestAlgorithm::Sha256.hex_digest(data)
}

#[derive(Debug, Clone)]
pub struct FingerprintStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    dirty: bool,
}

impl FingerprintStore {
    /// An empty store that will persist to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Load the store from `path`, failing open.
    pub async fn load(fs: &dyn FileSystemAccess, path: &Path) -> Self {
        match Self::try_load(fs, path).await {
            Ok(Some(store)) => {
                info!(path = %strip_path(path), entries = store.len(), "Loaded fingerprint store");
                store
            }
            Ok(None) => {
                info!(path = %strip_path(path), "No fingerprint store found, starting empty");
                Self::empty(path)
            }
            Err(e) => {
                warn!(
                    path = %strip_path(path),
                    error = %e,
                    "Fingerprint store unreadable, treating as empty (full reprocess)"
                );
                Self::empty(path)
            }
        }
    }

    async fn try_load(fs: &dyn FileSystemAccess, path: &Path) -> Result<Option<Self>> {
        if !fs.exists(path).await.map_err(store_io)? {
            return Ok(None);
        }

        let data = fs.read_file(path).await.map_err(store_io)?;
        let entries: BTreeMap<String, String> = serde_json::from_slice(&data)
            .map_err(|e| SyncError::StoreIo(format!("invalid fingerprint document: {}", e)))?;

        Ok(Some(Self {
            path: path.to_path_buf(),
            entries,
            dirty: false,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, identity: &str) -> Option<&str> {
        self.entries.get(identity).map(String::as_str)
    }

    pub fn put(&mut self, identity: &AssetIdentity, digest: impl Into<String>) {
        let digest = digest.into();
        if self.entries.get(identity.as_str()) != Some(&digest) {
            self.entries.insert(identity.as_str().to_string(), digest);
            self.dirty = true;
        }
    }

    pub fn remove(&mut self, identity: &str) -> Option<String> {
        let removed = self.entries.remove(identity);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Drop entries whose identity is neither in `current` nor held.
    /// Returns how many entries were removed.
    pub fn retain(&mut self, current: &HashSet<AssetIdentity>, held: &HoldSet) -> usize {
        let before = self.entries.len();
        self.entries.retain(|identity, _| {
            current.contains(identity.as_str()) || held.holds_identity(identity)
        });
        let removed = before - self.entries.len();
        if removed > 0 {
            self.dirty = true;
            debug!(removed, "Pruned fingerprints of removed assets");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Persist the whole mapping atomically. A clean store is not rewritten.
    pub async fn flush(&mut self, fs: &dyn FileSystemAccess) -> Result<()> {
        if !self.dirty {
            debug!(path = ?self.path, "Fingerprint store unchanged, skipping flush");
            return Ok(());
        }

        let data = serde_json::to_vec_pretty(&self.entries)?;
        fs.write_file_atomic(&self.path, Bytes::from(data))
            .await
            .map_err(store_io)?;
        self.dirty = false;

        info!(path = ?self.path, entries = self.entries.len(), "Flushed fingerprint store");
        Ok(())
    }
}

fn store_io(err: bridge_traits::error::BridgeError) -> SyncError {
    SyncError::StoreIo(err.to_string())
}
