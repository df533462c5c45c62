//! # Remote Sync
//!
//! Mirrors the local published tree into an [`ObjectStore`]. Both sides are
//! keyed by published identity (relative name without extension), so a file
//! whose published extension changed replaces its old remote object instead
//! of leaving it behind.
//!
//! | Local            | Remote (same identity)           | Operation |
//! |------------------|----------------------------------|-----------|
//! | present          | absent                           | Upload    |
//! | present          | same name and same content hash  | none (extra versions deleted) |
//! | present          | anything else                    | Replace   |
//! | absent           | present                          | Delete    |
//! | absent, held     | present                          | none (kept) |
//!
//! Operations run concurrently up to the configured limit. A rejected
//! credential aborts the whole pass; any other failure is recorded against
//! its object and the pass continues.

use crate::error::{Result, SyncError};
use crate::hold::HoldSet;
use crate::reconciler::lexical;
use crate::report::{ObjectFailure, OperationKind, RemoteSyncReport};
use bridge_traits::error::BridgeError;
use bridge_traits::storage::{FileSystemAccess, ObjectStore, RemoteObject};
use core_media::identity::{published_identity, relative_to};
use futures::{stream, StreamExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A published file as seen by the remote syncer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalObject {
    /// Relative name under the output root, `/`-separated
    pub name: String,
    pub path: PathBuf,
    /// Hex digest in the store's algorithm
    pub content_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOperation {
    Upload {
        local: LocalObject,
    },
    /// Delete every stale object of the identity, then upload
    Replace {
        local: LocalObject,
        stale: Vec<RemoteObject>,
    },
    Delete {
        remote: RemoteObject,
    },
}

impl SyncOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            SyncOperation::Upload { .. } => OperationKind::Upload,
            SyncOperation::Replace { .. } => OperationKind::Replace,
            SyncOperation::Delete { .. } => OperationKind::Delete,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SyncOperation::Upload { local } | SyncOperation::Replace { local, .. } => &local.name,
            SyncOperation::Delete { remote } => &remote.name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub operations: Vec<SyncOperation>,
    /// Local objects already current in the store
    pub unchanged: u64,
    /// Remote-only objects not deleted because their identity is held
    pub held: u64,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

fn identity_of(name: &str) -> String {
    published_identity(name).identity.into_string()
}

/// Compute the operations that make the store mirror `local`.
///
/// `local` must hold at most one object per identity. Remote objects whose
/// identity is `held` are never deleted.
pub fn plan_sync(local: Vec<LocalObject>, remote: Vec<RemoteObject>, held: &HoldSet) -> SyncPlan {
    let mut remote_by_identity: BTreeMap<String, Vec<RemoteObject>> = BTreeMap::new();
    for object in remote {
        remote_by_identity
            .entry(identity_of(&object.name))
            .or_default()
            .push(object);
    }

    let mut plan = SyncPlan::default();

    for local in local {
        let Some(objects) = remote_by_identity.remove(&identity_of(&local.name)) else {
            plan.operations.push(SyncOperation::Upload { local });
            continue;
        };

        let current = objects.iter().position(|object| {
            object.name == local.name
                && object
                    .content_hash
                    .as_deref()
                    .is_some_and(|hash| hash.eq_ignore_ascii_case(&local.content_hash))
        });

        match current {
            Some(index) => {
                plan.unchanged += 1;
                plan.operations.extend(
                    objects
                        .into_iter()
                        .enumerate()
                        .filter(|(i, _)| *i != index)
                        .map(|(_, remote)| SyncOperation::Delete { remote }),
                );
            }
            None => plan.operations.push(SyncOperation::Replace {
                local,
                stale: objects,
            }),
        }
    }

    for (identity, objects) in remote_by_identity {
        if held.holds_identity(&identity) {
            debug!(identity = %identity, "Remote object held, not deleting");
            plan.held += objects.len() as u64;
            continue;
        }
        plan.operations
            .extend(objects.into_iter().map(|remote| SyncOperation::Delete { remote }));
    }

    plan
}

/// Result of hashing the published tree.
#[derive(Debug, Default)]
pub struct LocalScan {
    pub objects: Vec<LocalObject>,
    /// Files that could not be read; their identities are in `held`
    pub failures: Vec<ObjectFailure>,
    pub held: HoldSet,
}

pub struct RemoteSyncer {
    fs: Arc<dyn FileSystemAccess>,
    store: Arc<dyn ObjectStore>,
    output_root: PathBuf,
    protected: Vec<PathBuf>,
    held: HoldSet,
    concurrency: usize,
}

impl RemoteSyncer {
    pub fn new(
        fs: Arc<dyn FileSystemAccess>,
        store: Arc<dyn ObjectStore>,
        output_root: impl Into<PathBuf>,
        concurrency: usize,
    ) -> Self {
        Self {
            fs,
            store,
            output_root: output_root.into(),
            protected: Vec::new(),
            held: HoldSet::new(),
            concurrency,
        }
    }

    /// Files under the output root that are never mirrored.
    pub fn with_protected(mut self, protected: Vec<PathBuf>) -> Self {
        self.protected = protected;
        self
    }

    /// Names whose remote objects must not be deleted this pass.
    pub fn with_held(mut self, held: HoldSet) -> Self {
        self.held = held;
        self
    }

    /// Hash every published file under the output root.
    ///
    /// When two files share an identity the first in sorted order wins. A
    /// file that cannot be read is recorded and its identity held, so the
    /// rest of the tree still syncs.
    pub async fn scan_local(&self) -> Result<LocalScan> {
        let algorithm = self.store.digest_algorithm();
        let root = lexical(&self.output_root);
        let protected: HashSet<String> = self
            .protected
            .iter()
            .filter_map(|path| relative_to(&root, &lexical(path)))
            .collect();

        let mut claimed: HashMap<String, String> = HashMap::new();
        let mut scan = LocalScan::default();

        for path in self.fs.walk_files(&self.output_root).await? {
            let Some(name) = relative_to(&root, &lexical(&path)) else {
                continue;
            };
            if protected.contains(&name) || name.ends_with(".tmp") {
                continue;
            }

            let identity = identity_of(&name);
            if let Some(existing) = claimed.get(&identity) {
                warn!(
                    name = %name,
                    kept = %existing,
                    "Two published files share an identity, skipping"
                );
                continue;
            }

            claimed.insert(identity.clone(), name.clone());
            match self.fs.read_file(&path).await {
                Ok(data) => scan.objects.push(LocalObject {
                    name,
                    path,
                    content_hash: algorithm.hex_digest(&data),
                }),
                Err(e) => {
                    warn!(name = %name, error = %e, "Cannot read published file, holding it");
                    scan.held.hold_identity(&identity);
                    scan.failures.push(ObjectFailure {
                        name,
                        operation: OperationKind::Upload,
                        message: format!("unreadable: {}", e),
                    });
                }
            }
        }

        debug!(
            count = scan.objects.len(),
            unreadable = scan.failures.len(),
            "Scanned published tree"
        );
        Ok(scan)
    }

    /// Scan, list, plan and apply.
    #[instrument(skip(self), fields(root = ?self.output_root))]
    pub async fn sync(&self) -> Result<RemoteSyncReport> {
        let LocalScan {
            objects,
            failures,
            mut held,
        } = self.scan_local().await?;
        let remote = self.store.list().await.map_err(SyncError::from_remote)?;
        info!(
            local = objects.len(),
            remote = remote.len(),
            "Planning remote sync"
        );

        held.extend(&self.held);
        let plan = plan_sync(objects, remote, &held);
        let mut report = self.apply(plan).await?;
        report.failed.splice(0..0, failures);
        Ok(report)
    }

    /// Execute a plan. Returns [`SyncError::RemoteAuth`] as soon as any
    /// operation reports rejected credentials; in-flight operations are
    /// dropped and nothing further is started.
    pub async fn apply(&self, plan: SyncPlan) -> Result<RemoteSyncReport> {
        let mut report = RemoteSyncReport {
            unchanged: plan.unchanged,
            held: plan.held,
            ..Default::default()
        };

        let mut auth_failure = None;
        {
            let mut results = stream::iter(plan.operations.into_iter().map(|op| self.execute(op)))
                .buffer_unordered(self.concurrency.max(1));

            while let Some((name, operation, result)) = results.next().await {
                match result {
                    Ok(()) => match operation {
                        OperationKind::Upload => report.uploaded += 1,
                        OperationKind::Replace => report.replaced += 1,
                        OperationKind::Delete => report.deleted += 1,
                    },
                    Err(e) if e.is_unauthorized() => {
                        auth_failure = Some(e);
                        break;
                    }
                    Err(e) => {
                        warn!(name = %name, ?operation, error = %e, "Remote operation failed");
                        report.failed.push(ObjectFailure {
                            name,
                            operation,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        if let Some(e) = auth_failure {
            warn!(error = %e, "Remote store rejected credentials, aborting sync");
            return Err(SyncError::from_remote(e));
        }

        info!(
            uploaded = report.uploaded,
            replaced = report.replaced,
            deleted = report.deleted,
            unchanged = report.unchanged,
            failed = report.failed.len(),
            "Remote sync finished"
        );
        Ok(report)
    }

    async fn execute(
        &self,
        operation: SyncOperation,
    ) -> (String, OperationKind, std::result::Result<(), BridgeError>) {
        let kind = operation.kind();
        let name = operation.name().to_string();

        let result = match operation {
            SyncOperation::Upload { local } => self
                .store
                .upload(&local.path, &local.name)
                .await
                .map(|_| ()),
            SyncOperation::Replace { local, stale } => {
                for object in &stale {
                    if let Err(e) = self.store.delete(&object.id, &object.name).await {
                        if e.is_unauthorized() {
                            return (name, kind, Err(e));
                        }
                        warn!(
                            name = %object.name,
                            error = %e,
                            "Failed to delete stale object, uploading anyway"
                        );
                    }
                }
                self.store
                    .upload(&local.path, &local.name)
                    .await
                    .map(|_| ())
            }
            SyncOperation::Delete { remote } => self.store.delete(&remote.id, &remote.name).await,
        };

        if result.is_ok() {
            debug!(name = %name, operation = ?kind, "Remote operation applied");
        }
        (name, kind, result)
    }
}
