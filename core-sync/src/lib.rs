//! # Core Sync
//!
//! The reconciliation engine of the asset pipeline.
//!
//! ## Overview
//!
//! A pass keeps three views of the same asset set consistent:
//! - the source tree (authoritative)
//! - the local published tree plus the output manifest
//! - the remote object store (optional)
//!
//! Change detection is content based: a source file is transcoded again only
//! when its SHA-256 differs from the [`FingerprintStore`] entry or its
//! published artifact is missing.
//!
//! ## Components
//!
//! - **Fingerprint Store** (`fingerprint`): durable identity to digest index
//! - **Manifest** (`manifest`): CSV rows in, JSON item records out
//! - **Local Reconciler** (`reconciler`): per-row discovery, transcoding and the
//!   orphan sweep
//! - **Holds** (`hold`): names of unreadable rows and files that no phase may
//!   delete this pass
//! - **Remote Sync** (`remote_sync`): identity-keyed mirror of the published
//!   tree into an object store
//! - **Sync Coordinator** (`coordinator`): runs the phases in order and builds
//!   the [`RunReport`]

pub mod coordinator;
pub mod error;
pub mod fingerprint;
pub mod hold;
pub mod manifest;
pub mod reconciler;
pub mod remote_sync;
pub mod report;

pub use coordinator::SyncCoordinator;
pub use error::{Result, SyncError};
pub use fingerprint::{content_digest, FingerprintStore};
pub use hold::HoldSet;
pub use manifest::{write_output_manifest, CsvManifest, ItemRecord, ManifestRow, ManifestSource};
pub use reconciler::{AssetState, LocalReconciler, ReconcileOutcome, ReconcilerSettings};
pub use remote_sync::{plan_sync, LocalObject, RemoteSyncer, SyncOperation, SyncPlan};
pub use report::{
    AssetFailure, FailureStage, ObjectFailure, OperationKind, ReconcileStats, RemoteSyncReport,
    RunReport, RunStatus,
};
