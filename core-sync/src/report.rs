//! # Run Reports
//!
//! Counters and failure records produced by each phase of a pipeline pass,
//! and the overall [`RunReport`] returned by the coordinator.

use crate::error::SyncError;
use bridge_traits::vcs::PublishOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Stage at which a single asset failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    SourceRead,
    Transcode,
    /// Identity already claimed by another source file
    Conflict,
    /// Row folder exists but could not be listed
    RowUnreadable,
}

/// A source asset that could not be published this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetFailure {
    /// Source-relative path as found on disk
    pub source: String,
    pub identity: String,
    pub stage: FailureStage,
    pub message: String,
}

impl AssetFailure {
    pub fn from_error(source: &str, identity: &str, error: &SyncError) -> Self {
        let stage = match error {
            SyncError::SourceRead { .. } => FailureStage::SourceRead,
            _ => FailureStage::Transcode,
        };
        Self {
            source: source.to_string(),
            identity: identity.to_string(),
            stage,
            message: error.to_string(),
        }
    }

    /// A whole row folder; `folder` is its identity prefix.
    pub fn row_unreadable(folder: &str, message: String) -> Self {
        Self {
            source: folder.to_string(),
            identity: folder.to_string(),
            stage: FailureStage::RowUnreadable,
            message,
        }
    }

    pub fn conflict(source: &str, identity: &str, claimed_by: &str) -> Self {
        Self {
            source: source.to_string(),
            identity: identity.to_string(),
            stage: FailureStage::Conflict,
            message: format!("identity already claimed by {}", claimed_by),
        }
    }
}

/// Local reconciliation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub rows_total: u64,
    /// Rows whose folder is missing or holds no supported files
    pub rows_skipped: u64,
    /// Rows whose folder could not be read; their artifacts are held
    pub rows_failed: u64,
    pub assets_seen: u64,
    pub transcoded: u64,
    pub unchanged: u64,
    pub failed: u64,
    pub conflicts: u64,
    pub orphans_deleted: u64,
    pub fingerprints_pruned: u64,
}

impl ReconcileStats {
    pub fn total_processed(&self) -> u64 {
        self.transcoded + self.unchanged
    }
}

/// Kind of remote operation, for failure records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Upload,
    Replace,
    Delete,
}

/// A remote object operation that failed without aborting the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectFailure {
    pub name: String,
    pub operation: OperationKind,
    pub message: String,
}

/// Remote sync counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoteSyncReport {
    pub uploaded: u64,
    pub replaced: u64,
    pub deleted: u64,
    pub unchanged: u64,
    /// Remote-only objects kept because their local side is held
    pub held: u64,
    pub failed: Vec<ObjectFailure>,
}

impl RemoteSyncReport {
    /// Operations actually performed against the store.
    pub fn operations(&self) -> u64 {
        self.uploaded + self.replaced + self.deleted
    }
}

/// Overall result of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every phase completed without failures
    Completed,
    /// The pass finished but some assets, objects or phases failed
    CompletedWithErrors,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub local: ReconcileStats,
    pub asset_failures: Vec<AssetFailure>,
    pub items_written: usize,
    /// `None` when no remote store is configured
    pub remote: Option<RemoteSyncReport>,
    /// Set when the remote phase was aborted
    pub remote_error: Option<String>,
    #[serde(skip)]
    pub publish: Option<PublishOutcome>,
    pub publish_error: Option<String>,
}

impl RunReport {
    pub fn status(&self) -> RunStatus {
        let remote_failed = self
            .remote
            .as_ref()
            .map(|r| !r.failed.is_empty())
            .unwrap_or(false);

        if self.asset_failures.is_empty()
            && !remote_failed
            && self.remote_error.is_none()
            && self.publish_error.is_none()
        {
            RunStatus::Completed
        } else {
            RunStatus::CompletedWithErrors
        }
    }

    pub fn duration_secs(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}
