//! # Local Reconciler
//!
//! Walks each manifest row's source folder, decides per asset whether the
//! published artifact is current, transcodes what changed, and collects the
//! output records plus the authoritative set of current identities.
//!
//! ## Per-asset state
//!
//! ```text
//! read bytes ──► digest ──► Unseen    (no fingerprint)            ──► transcode, put
//!                       ├─► Changed   (digest differs / no output) ──► transcode, put
//!                       └─► Unchanged                              ──► URL only
//! ```
//!
//! Transcodes of distinct assets run concurrently (bounded, ordered), and
//! fingerprint updates are applied by the reconciling task after each unit
//! completes, so the store is never shared across tasks.
//!
//! After all rows, [`LocalReconciler::sweep_orphans`] deletes published files
//! that no current asset maps to.

use crate::error::{Result, SyncError};
use crate::fingerprint::{content_digest, FingerprintStore};
use crate::hold::HoldSet;
use crate::manifest::{ItemRecord, ManifestRow};
use crate::report::{AssetFailure, ReconcileStats};
use bridge_traits::storage::FileSystemAccess;
use core_media::identity::{encode_whitespace, relative_to};
use core_media::{AssetIdentity, SourceAsset, TranscodeJob, Transcoder};
use core_runtime::config::{PipelineConfig, PublishMode};
use core_runtime::logging::display_path;
use futures::{stream, StreamExt};
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Paths and knobs the reconciler needs from the pipeline configuration.
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub source_root: PathBuf,
    pub output_root: PathBuf,
    pub public_subfolder: String,
    pub no_resize_marker: String,
    pub publish_mode: PublishMode,
    pub transcode_concurrency: usize,
}

impl ReconcilerSettings {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            source_root: config.source_root.clone(),
            output_root: config.output_root.clone(),
            public_subfolder: config.public_subfolder.clone(),
            no_resize_marker: config.no_resize_marker.clone(),
            publish_mode: config.publish_mode.clone(),
            transcode_concurrency: config.concurrency.transcode,
        }
    }
}

/// Change-detection state of one source asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    /// No fingerprint recorded
    Unseen,
    /// Fingerprint matches and the published artifact exists
    Unchanged,
    /// Fingerprint differs or the published artifact is missing
    Changed,
}

impl AssetState {
    pub fn classify(stored: Option<&str>, digest: &str, artifact_exists: bool) -> Self {
        match stored {
            None => AssetState::Unseen,
            Some(stored) if stored.eq_ignore_ascii_case(digest) && artifact_exists => {
                AssetState::Unchanged
            }
            Some(_) => AssetState::Changed,
        }
    }

    pub fn needs_transcode(&self) -> bool {
        !matches!(self, AssetState::Unchanged)
    }
}

/// Everything the local phase produced. Returned to the caller; nothing is
/// kept in shared state.
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    pub items: Vec<ItemRecord>,
    /// Identities of every source asset present this run
    pub current: HashSet<AssetIdentity>,
    /// Published names (relative to the output root) that must survive the
    /// orphan sweep
    pub expected_artifacts: HashSet<String>,
    pub stats: ReconcileStats,
    pub failures: Vec<AssetFailure>,
    /// Rows that could not be read: their published files, fingerprints and
    /// remote objects must survive this pass
    pub held: HoldSet,
}

pub struct LocalReconciler {
    fs: Arc<dyn FileSystemAccess>,
    transcoder: Arc<dyn Transcoder>,
    settings: ReconcilerSettings,
}

impl LocalReconciler {
    pub fn new(
        fs: Arc<dyn FileSystemAccess>,
        transcoder: Arc<dyn Transcoder>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            fs,
            transcoder,
            settings,
        }
    }

    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    /// `<source_root>/<folder or title>/<public subfolder>`
    pub fn row_folder(&self, row: &ManifestRow) -> PathBuf {
        let folder = self.settings.source_root.join(row.folder_name());
        if self.settings.public_subfolder.is_empty() {
            folder
        } else {
            folder.join(&self.settings.public_subfolder)
        }
    }

    /// Reconcile every row against the source tree and the fingerprint store.
    #[instrument(skip_all, fields(rows = rows.len()))]
    pub async fn reconcile(
        &self,
        rows: &[ManifestRow],
        store: &mut FingerprintStore,
    ) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();
        // identity -> source-relative path of the file that claimed it
        let mut claimed: HashMap<AssetIdentity, String> = HashMap::new();

        for row in rows {
            outcome.stats.rows_total += 1;
            self.reconcile_row(row, store, &mut claimed, &mut outcome)
                .await;
        }

        info!(
            rows = outcome.stats.rows_total,
            skipped = outcome.stats.rows_skipped,
            unreadable = outcome.stats.rows_failed,
            transcoded = outcome.stats.transcoded,
            unchanged = outcome.stats.unchanged,
            failed = outcome.stats.failed,
            conflicts = outcome.stats.conflicts,
            "Local reconciliation finished"
        );
        outcome
    }

    async fn discover(&self, folder: &Path) -> Result<Vec<SourceAsset>> {
        let files = self.fs.walk_files(folder).await?;
        Ok(files
            .iter()
            .filter_map(|path| {
                let asset = SourceAsset::classify(
                    &self.settings.source_root,
                    path,
                    &self.settings.no_resize_marker,
                );
                if asset.is_none() {
                    debug!(
                        path = %display_path(&self.settings.source_root, path),
                        "Ignoring unsupported file"
                    );
                }
                asset
            })
            .collect())
    }

    async fn reconcile_row(
        &self,
        row: &ManifestRow,
        store: &mut FingerprintStore,
        claimed: &mut HashMap<AssetIdentity, String>,
        outcome: &mut ReconcileOutcome,
    ) {
        let folder = self.row_folder(row);
        let shown = display_path(&self.settings.source_root, &folder);

        match self.fs.exists(&folder).await {
            Ok(true) => {}
            Ok(false) => {
                info!(row = %row.id, folder = %shown, "Row folder missing, skipping");
                outcome.stats.rows_skipped += 1;
                return;
            }
            Err(e) => {
                warn!(row = %row.id, folder = %shown, error = %e, "Cannot access row folder");
                self.hold_row(&folder, &e, outcome);
                return;
            }
        }

        let assets = match self.discover(&folder).await {
            Ok(assets) => assets,
            Err(e) => {
                warn!(row = %row.id, folder = %shown, error = %e, "Failed to list row folder");
                self.hold_row(&folder, &e, outcome);
                return;
            }
        };

        if assets.is_empty() {
            info!(row = %row.id, folder = %shown, "No supported files, skipping row");
            outcome.stats.rows_skipped += 1;
            return;
        }

        let mut work = Vec::with_capacity(assets.len());
        for asset in assets {
            outcome.stats.assets_seen += 1;
            match claimed.get(&asset.identity) {
                Some(owner) if owner != &asset.relative => {
                    warn!(
                        source = %asset.relative,
                        identity = %asset.identity,
                        claimed_by = %owner,
                        "Identity collision, skipping asset"
                    );
                    outcome.stats.conflicts += 1;
                    outcome.failures.push(AssetFailure::conflict(
                        &asset.relative,
                        asset.identity.as_str(),
                        owner,
                    ));
                    continue;
                }
                // Same file listed by another row
                Some(_) => {}
                None => {
                    claimed.insert(asset.identity.clone(), asset.relative.clone());
                }
            }
            let stored = store.get(asset.identity.as_str()).map(str::to_string);
            work.push((asset, stored));
        }

        let mut item = ItemRecord::from_row(row);
        let mut results = stream::iter(
            work.into_iter()
                .map(|(asset, stored)| self.process_asset(asset, stored)),
        )
        .buffered(self.settings.transcode_concurrency.max(1));

        while let Some((asset, result)) = results.next().await {
            let published_name = asset.published_name();
            // A failed asset still exists in the source tree: keep its
            // fingerprint and any previously published artifact.
            outcome.current.insert(asset.identity.clone());
            outcome.expected_artifacts.insert(published_name.clone());

            match result {
                Ok((digest, state)) => {
                    if state.needs_transcode() {
                        store.put(&asset.identity, digest);
                        outcome.stats.transcoded += 1;
                    } else {
                        outcome.stats.unchanged += 1;
                    }
                    item.push_artifact(
                        asset.kind,
                        self.settings.publish_mode.url_for(&published_name),
                    );
                }
                Err(err) => {
                    warn!(source = %asset.relative, error = %err, "Asset failed, continuing");
                    outcome.stats.failed += 1;
                    outcome.failures.push(AssetFailure::from_error(
                        &asset.relative,
                        asset.identity.as_str(),
                        &err,
                    ));
                }
            }
        }

        if item.is_publishable() {
            outcome.items.push(item);
        } else {
            debug!(row = %row.id, "Row has nothing publishable");
        }
    }

    /// Record an unreadable row folder and hold everything published from it.
    fn hold_row(&self, folder: &Path, error: &dyn Display, outcome: &mut ReconcileOutcome) {
        let prefix = relative_to(&lexical(&self.settings.source_root), &lexical(folder))
            .map(|relative| encode_whitespace(&relative))
            .unwrap_or_default();
        outcome.held.hold_prefix(&prefix);
        outcome.stats.rows_failed += 1;
        outcome
            .failures
            .push(AssetFailure::row_unreadable(&prefix, error.to_string()));
    }

    async fn process_asset(
        &self,
        asset: SourceAsset,
        stored: Option<String>,
    ) -> (SourceAsset, Result<(String, AssetState)>) {
        let result = self.evaluate(&asset, stored.as_deref()).await;
        (asset, result)
    }

    async fn evaluate(
        &self,
        asset: &SourceAsset,
        stored: Option<&str>,
    ) -> Result<(String, AssetState)> {
        let data = self
            .fs
            .read_file(&asset.path)
            .await
            .map_err(|e| SyncError::SourceRead {
                path: asset.relative.clone(),
                message: e.to_string(),
            })?;
        let digest = content_digest(&data);
        drop(data);

        let output = asset.output_path(&self.settings.output_root);
        let artifact_exists = self.fs.exists(&output).await.unwrap_or(false);
        let state = AssetState::classify(stored, &digest, artifact_exists);
        debug!(identity = %asset.identity, ?state, "Evaluated asset");

        if state.needs_transcode() {
            let job = TranscodeJob::for_asset(asset, &self.settings.output_root);
            self.transcoder
                .transcode(&job)
                .await
                .map_err(|e| SyncError::from_media(Path::new(&asset.relative), e))?;
        }

        Ok((digest, state))
    }

    /// Delete every file under the output root that is neither an expected
    /// artifact, nor held, nor one of the `protected` bookkeeping files.
    ///
    /// Returns the number of files deleted. Individual delete failures are
    /// logged and skipped.
    #[instrument(skip_all, fields(expected = expected.len()))]
    pub async fn sweep_orphans(
        &self,
        expected: &HashSet<String>,
        held: &HoldSet,
        protected: &[PathBuf],
    ) -> Result<u64> {
        let root = lexical(&self.settings.output_root);
        let protected: HashSet<String> = protected
            .iter()
            .filter_map(|path| relative_to(&root, &lexical(path)))
            .collect();

        let mut deleted = 0;
        for path in self.fs.walk_files(&self.settings.output_root).await? {
            let Some(relative) = relative_to(&root, &lexical(&path)) else {
                continue;
            };
            if expected.contains(&relative) || protected.contains(&relative) {
                continue;
            }
            if held.holds_name(&relative) {
                debug!(artifact = %relative, "Artifact held, not sweeping");
                continue;
            }

            match self.fs.delete_file(&path).await {
                Ok(()) => {
                    info!(artifact = %relative, "Deleted orphaned artifact");
                    deleted += 1;
                }
                Err(e) => warn!(artifact = %relative, error = %e, "Failed to delete orphan"),
            }
        }

        Ok(deleted)
    }
}

/// Drop `.` components so differently-spelled relative paths compare equal.
pub(crate) fn lexical(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::report::FailureStage;
    use bridge_desktop::TokioFileSystem;
    use bridge_traits::error::BridgeError;
    use bridge_traits::storage::FileMetadata;
    use bytes::Bytes;
    use core_media::{MediaError, TranscodeOutcome};
    use mockall::mock;
    use tempfile::TempDir;

    mock! {
        Fs {}

        #[async_trait]
        impl FileSystemAccess for Fs {
            async fn exists(&self, path: &Path) -> bridge_traits::error::Result<bool>;
            async fn metadata(&self, path: &Path) -> bridge_traits::error::Result<FileMetadata>;
            async fn create_dir_all(&self, path: &Path) -> bridge_traits::error::Result<()>;
            async fn read_file(&self, path: &Path) -> bridge_traits::error::Result<Bytes>;
            async fn write_file(&self, path: &Path, data: Bytes) -> bridge_traits::error::Result<()>;
            async fn rename(&self, from: &Path, to: &Path) -> bridge_traits::error::Result<()>;
            async fn delete_file(&self, path: &Path) -> bridge_traits::error::Result<()>;
            async fn list_directory(&self, path: &Path) -> bridge_traits::error::Result<Vec<PathBuf>>;
            async fn walk_files(&self, root: &Path) -> bridge_traits::error::Result<Vec<PathBuf>>;
        }
    }

    mock! {
        Transcoder {}

        #[async_trait]
        impl Transcoder for Transcoder {
            async fn transcode(&self, job: &TranscodeJob) -> core_media::Result<TranscodeOutcome>;
        }
    }

    fn settings(dir: &TempDir) -> ReconcilerSettings {
        ReconcilerSettings {
            source_root: dir.path().join("src"),
            output_root: dir.path().join("out"),
            public_subfolder: "PUBLIC".to_string(),
            no_resize_marker: "NR=".to_string(),
            publish_mode: PublishMode::Local {
                base_path: "web_content".to_string(),
            },
            transcode_concurrency: 2,
        }
    }

    fn write(path: &Path, data: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    fn row(id: &str, title: &str) -> ManifestRow {
        ManifestRow {
            id: id.to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    /// Transcoder mock that materializes the output file like the real one.
    fn writing_transcoder(times: usize) -> MockTranscoder {
        let mut transcoder = MockTranscoder::new();
        transcoder.expect_transcode().times(times).returning(|job| {
            write(&job.output, b"artifact");
            Ok(TranscodeOutcome::Copied { bytes: 8 })
        });
        transcoder
    }

    #[test]
    fn test_asset_state_classification() {
        assert_eq!(AssetState::classify(None, "d", true), AssetState::Unseen);
        assert_eq!(AssetState::classify(Some("d"), "d", true), AssetState::Unchanged);
        assert_eq!(AssetState::classify(Some("D"), "d", true), AssetState::Unchanged);
        assert_eq!(AssetState::classify(Some("d"), "d", false), AssetState::Changed);
        assert_eq!(AssetState::classify(Some("x"), "d", true), AssetState::Changed);
        assert!(AssetState::Unseen.needs_transcode());
        assert!(!AssetState::Unchanged.needs_transcode());
    }

    #[tokio::test]
    async fn test_first_run_transcodes_and_records() {
        let dir = TempDir::new().unwrap();
        let s = settings(&dir);
        write(&s.source_root.join("Project One/PUBLIC/a hero.png"), b"png");
        write(&s.source_root.join("Project One/PUBLIC/clip.gif"), b"gif");
        write(&s.source_root.join("Project One/PUBLIC/about.md"), b"# hi");
        write(&s.source_root.join("Project One/PUBLIC/notes.txt"), b"skip");

        let reconciler = LocalReconciler::new(
            Arc::new(TokioFileSystem::new()),
            Arc::new(writing_transcoder(3)),
            s,
        );
        let mut store = FingerprintStore::empty(dir.path().join("fp.json"));
        let outcome = reconciler
            .reconcile(&[row("1", "Project One")], &mut store)
            .await;

        assert_eq!(outcome.stats.transcoded, 3);
        assert_eq!(store.len(), 3);
        assert_eq!(outcome.items.len(), 1);

        let item = &outcome.items[0];
        assert_eq!(
            item.images_paths,
            vec![
                "web_content/Project_One/PUBLIC/a_hero.jpg",
                "web_content/Project_One/PUBLIC/clip.mp4",
            ]
        );
        assert_eq!(
            item.video_path.as_deref(),
            Some("web_content/Project_One/PUBLIC/clip.mp4")
        );
        assert_eq!(
            item.description_path.as_deref(),
            Some("web_content/Project_One/PUBLIC/about.md")
        );
        assert!(outcome
            .expected_artifacts
            .contains("Project_One/PUBLIC/a_hero.jpg"));
    }

    #[tokio::test]
    async fn test_unchanged_assets_are_not_transcoded() {
        let dir = TempDir::new().unwrap();
        let s = settings(&dir);
        let source = s.source_root.join("P/PUBLIC/a.png");
        write(&source, b"png");
        write(&s.output_root.join("P/PUBLIC/a.jpg"), b"artifact");

        let mut store = FingerprintStore::empty(dir.path().join("fp.json"));
        store.put(&core_media::source_identity("P/PUBLIC/a.png").identity, content_digest(b"png"));

        let reconciler = LocalReconciler::new(
            Arc::new(TokioFileSystem::new()),
            Arc::new(writing_transcoder(0)),
            s,
        );
        let outcome = reconciler.reconcile(&[row("1", "P")], &mut store).await;

        assert_eq!(outcome.stats.unchanged, 1);
        assert_eq!(outcome.stats.transcoded, 0);
        assert_eq!(outcome.items[0].images_paths, vec!["web_content/P/PUBLIC/a.jpg"]);
    }

    #[tokio::test]
    async fn test_missing_artifact_forces_transcode() {
        let dir = TempDir::new().unwrap();
        let s = settings(&dir);
        write(&s.source_root.join("P/PUBLIC/a.png"), b"png");

        let mut store = FingerprintStore::empty(dir.path().join("fp.json"));
        store.put(&core_media::source_identity("P/PUBLIC/a.png").identity, content_digest(b"png"));

        let reconciler = LocalReconciler::new(
            Arc::new(TokioFileSystem::new()),
            Arc::new(writing_transcoder(1)),
            s,
        );
        let outcome = reconciler.reconcile(&[row("1", "P")], &mut store).await;
        assert_eq!(outcome.stats.transcoded, 1);
    }

    #[tokio::test]
    async fn test_transcode_failure_is_isolated() {
        let dir = TempDir::new().unwrap();
        let s = settings(&dir);
        write(&s.source_root.join("P/PUBLIC/bad.png"), b"bad");
        write(&s.source_root.join("P/PUBLIC/good.png"), b"good");

        let mut transcoder = MockTranscoder::new();
        transcoder.expect_transcode().times(2).returning(|job| {
            if job.source.ends_with("bad.png") {
                Err(MediaError::UnsupportedKind(job.source.clone()))
            } else {
                write(&job.output, b"ok");
                Ok(TranscodeOutcome::Image {
                    width: 1,
                    height: 1,
                })
            }
        });

        let reconciler =
            LocalReconciler::new(Arc::new(TokioFileSystem::new()), Arc::new(transcoder), s);
        let mut store = FingerprintStore::empty(dir.path().join("fp.json"));
        let outcome = reconciler.reconcile(&[row("1", "P")], &mut store).await;

        assert_eq!(outcome.stats.failed, 1);
        assert_eq!(outcome.failures[0].source, "P/PUBLIC/bad.png");
        assert_eq!(store.get("P/PUBLIC/bad"), None);
        assert!(store.get("P/PUBLIC/good").is_some());
        assert_eq!(outcome.items[0].images_paths, vec!["web_content/P/PUBLIC/good.jpg"]);
        // Still a current asset, so its fingerprint and old artifact survive
        assert!(outcome.current.contains("P/PUBLIC/bad"));
    }

    #[tokio::test]
    async fn test_identity_collision_first_wins() {
        let dir = TempDir::new().unwrap();
        let s = settings(&dir);
        write(&s.source_root.join("P/PUBLIC/a b.png"), b"1");
        write(&s.source_root.join("P/PUBLIC/a_b.png"), b"2");

        let reconciler = LocalReconciler::new(
            Arc::new(TokioFileSystem::new()),
            Arc::new(writing_transcoder(1)),
            s,
        );
        let mut store = FingerprintStore::empty(dir.path().join("fp.json"));
        let outcome = reconciler.reconcile(&[row("1", "P")], &mut store).await;

        assert_eq!(outcome.stats.conflicts, 1);
        assert_eq!(outcome.failures[0].source, "P/PUBLIC/a_b.png");
        assert_eq!(store.get("P/PUBLIC/a_b"), Some(content_digest(b"1").as_str()));
    }

    #[tokio::test]
    async fn test_missing_and_empty_rows_are_skipped() {
        let dir = TempDir::new().unwrap();
        let s = settings(&dir);
        write(&s.source_root.join("Empty/PUBLIC/readme.txt"), b"x");

        let reconciler = LocalReconciler::new(
            Arc::new(TokioFileSystem::new()),
            Arc::new(writing_transcoder(0)),
            s,
        );
        let mut store = FingerprintStore::empty(dir.path().join("fp.json"));
        let outcome = reconciler
            .reconcile(&[row("1", "Missing"), row("2", "Empty")], &mut store)
            .await;

        assert_eq!(outcome.stats.rows_total, 2);
        assert_eq!(outcome.stats.rows_skipped, 2);
        assert!(outcome.items.is_empty());
    }

    #[tokio::test]
    async fn test_folder_override_and_no_subfolder() {
        let dir = TempDir::new().unwrap();
        let mut s = settings(&dir);
        s.public_subfolder = String::new();
        write(&s.source_root.join("custom/x.md"), b"doc");

        let reconciler = LocalReconciler::new(
            Arc::new(TokioFileSystem::new()),
            Arc::new(writing_transcoder(1)),
            s,
        );
        let mut r = row("1", "Title");
        r.folder = Some("custom".to_string());
        let mut store = FingerprintStore::empty(dir.path().join("fp.json"));
        let outcome = reconciler.reconcile(&[r], &mut store).await;

        assert_eq!(
            outcome.items[0].description_path.as_deref(),
            Some("web_content/custom/x.md")
        );
        assert!(outcome.items[0].images_paths.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_removes_orphans_and_keeps_protected() {
        let dir = TempDir::new().unwrap();
        let s = settings(&dir);
        let out = s.output_root.clone();
        write(&out.join("P/PUBLIC/keep.jpg"), b"k");
        write(&out.join("P/PUBLIC/gone.jpg"), b"g");
        write(&out.join("P/PUBLIC/keep.png"), b"stale ext");
        write(&out.join("hashed_mirror.json"), b"{}");

        let reconciler = LocalReconciler::new(
            Arc::new(TokioFileSystem::new()),
            Arc::new(writing_transcoder(0)),
            s,
        );
        let expected: HashSet<String> = ["P/PUBLIC/keep.jpg".to_string()].into_iter().collect();
        let deleted = reconciler
            .sweep_orphans(
                &expected,
                &HoldSet::new(),
                &[out.join("./hashed_mirror.json")],
            )
            .await
            .unwrap();

        assert_eq!(deleted, 2);
        assert!(out.join("P/PUBLIC/keep.jpg").exists());
        assert!(!out.join("P/PUBLIC/gone.jpg").exists());
        assert!(!out.join("P/PUBLIC/keep.png").exists());
        assert!(out.join("hashed_mirror.json").exists());
    }

    #[tokio::test]
    async fn test_unreadable_row_is_held_and_reported() {
        let dir = TempDir::new().unwrap();
        let s = settings(&dir);

        let mut fs = MockFs::new();
        fs.expect_exists().returning(|_| Ok(true));
        fs.expect_walk_files()
            .returning(|_| Err(BridgeError::OperationFailed("EIO".to_string())));

        let mut transcoder = MockTranscoder::new();
        transcoder.expect_transcode().never();

        let reconciler = LocalReconciler::new(Arc::new(fs), Arc::new(transcoder), s);
        let mut store = FingerprintStore::empty(dir.path().join("fp.json"));
        let outcome = reconciler
            .reconcile(&[row("1", "My Project")], &mut store)
            .await;

        assert_eq!(outcome.stats.rows_failed, 1);
        assert_eq!(outcome.stats.rows_skipped, 0);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].stage, FailureStage::RowUnreadable);
        assert_eq!(outcome.failures[0].source, "My_Project/PUBLIC");
        assert!(outcome.held.holds_name("My_Project/PUBLIC/about.md"));
        assert!(!outcome.held.holds_name("Other/PUBLIC/about.md"));
    }

    #[tokio::test]
    async fn test_sweep_keeps_held_artifacts() {
        let dir = TempDir::new().unwrap();
        let s = settings(&dir);
        let out = s.output_root.clone();
        write(&out.join("P/PUBLIC/about.md"), b"a");
        write(&out.join("P/PUBLIC/nested/hero.jpg"), b"h");
        write(&out.join("Q/PUBLIC/gone.md"), b"g");

        let reconciler = LocalReconciler::new(
            Arc::new(TokioFileSystem::new()),
            Arc::new(writing_transcoder(0)),
            s,
        );
        let mut held = HoldSet::new();
        held.hold_prefix("P/PUBLIC");
        let deleted = reconciler
            .sweep_orphans(&HashSet::new(), &held, &[])
            .await
            .unwrap();

        assert_eq!(deleted, 1);
        assert!(out.join("P/PUBLIC/about.md").exists());
        assert!(out.join("P/PUBLIC/nested/hero.jpg").exists());
        assert!(!out.join("Q/PUBLIC/gone.md").exists());
    }

    #[test]
    fn test_row_folder() {
        let dir = TempDir::new().unwrap();
        let s = settings(&dir);
        let root = s.source_root.clone();
        let reconciler = LocalReconciler::new(
            Arc::new(TokioFileSystem::new()),
            Arc::new(MockTranscoder::new()),
            s,
        );
        assert_eq!(
            reconciler.row_folder(&row("1", "Project One")),
            root.join("Project One").join("PUBLIC")
        );
    }
}
