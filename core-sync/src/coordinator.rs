//! # Sync Coordinator
//!
//! Runs one pipeline pass end to end.
//!
//! ## Workflow
//!
//! 1. Read the manifest (fatal on failure)
//! 2. Load the fingerprint store (fails open)
//! 3. Reconcile every row: transcode new and changed assets
//! 4. Sweep orphaned artifacts from the published tree
//! 5. Prune fingerprints of removed assets and flush the store (fatal on failure)
//!
//! A row whose folder cannot be read is held through steps 4, 5 and 7: its
//! artifacts, fingerprints and remote objects are kept and the failure is
//! reported.
//! 6. Write the output manifest (fatal on failure)
//! 7. Mirror the published tree to the remote store, when configured
//! 8. Commit and push the published tree, when configured
//!
//! Steps 7 and 8 never undo local results: their failures are recorded in
//! the [`RunReport`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{CsvManifest, SyncCoordinator};
//! use core_media::MediaTranscoder;
//! use std::sync::Arc;
//!
//! # async fn example(config: core_runtime::PipelineConfig, fs: Arc<dyn bridge_traits::FileSystemAccess>) -> core_sync::Result<()> {
//! let manifest = Arc::new(CsvManifest::new(fs.clone(), &config.manifest_path));
//! let transcoder = Arc::new(MediaTranscoder::from_config(&config));
//! let report = SyncCoordinator::new(config, fs, manifest, transcoder)
//!     .run()
//!     .await?;
//! println!("{} items published", report.items_written);
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, SyncError};
use crate::fingerprint::FingerprintStore;
use crate::hold::HoldSet;
use crate::manifest::{write_output_manifest, ManifestSource};
use crate::reconciler::{LocalReconciler, ReconcilerSettings};
use crate::remote_sync::RemoteSyncer;
use crate::report::{RemoteSyncReport, RunReport};
use bridge_traits::storage::{FileSystemAccess, ObjectStore};
use bridge_traits::time::{Clock, SystemClock};
use bridge_traits::vcs::{PublishOutcome, VersionControl};
use core_media::Transcoder;
use core_runtime::config::PipelineConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub struct SyncCoordinator {
    config: PipelineConfig,
    fs: Arc<dyn FileSystemAccess>,
    manifest: Arc<dyn ManifestSource>,
    transcoder: Arc<dyn Transcoder>,
    object_store: Option<Arc<dyn ObjectStore>>,
    version_control: Option<Arc<dyn VersionControl>>,
    clock: Arc<dyn Clock>,
}

impl SyncCoordinator {
    pub fn new(
        config: PipelineConfig,
        fs: Arc<dyn FileSystemAccess>,
        manifest: Arc<dyn ManifestSource>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            config,
            fs,
            manifest,
            transcoder,
            object_store: None,
            version_control: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Enable the remote phase.
    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    /// Enable the publish step.
    pub fn with_version_control(mut self, vcs: Arc<dyn VersionControl>) -> Self {
        self.version_control = Some(vcs);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Bookkeeping files that live next to the artifacts but are not
    /// artifacts themselves.
    fn protected_paths(&self) -> Vec<PathBuf> {
        vec![
            self.config.fingerprint_path.clone(),
            self.config.output_manifest_path.clone(),
        ]
    }

    /// Execute one pass.
    ///
    /// # Errors
    ///
    /// Only phase-fatal failures are returned: a missing source root, an
    /// unreadable manifest, a failed fingerprint flush or a failed output
    /// manifest write. Everything else is recorded in the report.
    #[instrument(skip(self), fields(source = ?self.config.source_root))]
    pub async fn run(&self) -> Result<RunReport> {
        let started_at = self.clock.now();

        if !self.fs.exists(&self.config.source_root).await? {
            return Err(SyncError::Config(format!(
                "Source root {} does not exist",
                self.config.source_root.display()
            )));
        }

        let rows = self.manifest.read_rows().await?;
        let mut store =
            FingerprintStore::load(self.fs.as_ref(), &self.config.fingerprint_path).await;

        let reconciler = LocalReconciler::new(
            self.fs.clone(),
            self.transcoder.clone(),
            ReconcilerSettings::from_config(&self.config),
        );
        let mut outcome = reconciler.reconcile(&rows, &mut store).await;

        let protected = self.protected_paths();
        outcome.stats.orphans_deleted = match reconciler
            .sweep_orphans(&outcome.expected_artifacts, &outcome.held, &protected)
            .await
        {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!(error = %e, "Orphan sweep failed, stale artifacts may remain");
                0
            }
        };

        outcome.stats.fingerprints_pruned =
            store.retain(&outcome.current, &outcome.held) as u64;
        store.flush(self.fs.as_ref()).await?;

        let items_written = write_output_manifest(
            self.fs.as_ref(),
            &self.config.output_manifest_path,
            &outcome.items,
        )
        .await?;

        let (remote, remote_error) = self.sync_remote(protected, outcome.held).await;
        let (publish, publish_error) = self.publish().await;

        let report = RunReport {
            started_at,
            finished_at: self.clock.now(),
            local: outcome.stats,
            asset_failures: outcome.failures,
            items_written,
            remote,
            remote_error,
            publish,
            publish_error,
        };

        info!(
            status = ?report.status(),
            items = report.items_written,
            transcoded = report.local.transcoded,
            orphans_deleted = report.local.orphans_deleted,
            duration_secs = report.duration_secs(),
            "Pipeline pass finished"
        );
        Ok(report)
    }

    async fn sync_remote(
        &self,
        protected: Vec<PathBuf>,
        held: HoldSet,
    ) -> (Option<RemoteSyncReport>, Option<String>) {
        let Some(store) = &self.object_store else {
            debug!("No remote store configured, skipping remote sync");
            return (None, None);
        };

        let syncer = RemoteSyncer::new(
            self.fs.clone(),
            store.clone(),
            &self.config.output_root,
            self.config.concurrency.upload,
        )
        .with_protected(protected)
        .with_held(held);

        match syncer.sync().await {
            Ok(report) => (Some(report), None),
            Err(e) => {
                error!(error = %e, "Remote sync aborted, local results kept");
                (None, Some(e.to_string()))
            }
        }
    }

    async fn publish(&self) -> (Option<PublishOutcome>, Option<String>) {
        let Some(vcs) = &self.version_control else {
            debug!("No version control configured, skipping publish");
            return (None, None);
        };

        match vcs.commit_and_push().await {
            Ok(outcome) => (Some(outcome), None),
            Err(e) => {
                warn!(error = %e, "Publish step failed");
                (None, Some(e.to_string()))
            }
        }
    }
}
