//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (filesystem, HTTP,
//! version control) and the optional remote object store into a
//! [`SyncCoordinator`]. Desktop hosts enable the `desktop-shims` feature
//! (which depends on `bridge-desktop`); the `backblaze` feature adds the B2
//! connector from `provider-backblaze`.

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{
    storage::{FileSystemAccess, ObjectStore},
    time::LogLevel,
    vcs::VersionControl,
};
use core_media::Transcoder;
use core_runtime::config::PipelineConfig;
use core_runtime::logging::{LogFormat, LoggingConfig};
use core_sync::{ManifestSource, RunReport, SyncCoordinator};

/// Aggregated handle to all bridge dependencies a pass requires.
pub struct CoreDependencies {
    pub filesystem: Arc<dyn FileSystemAccess>,
    pub transcoder: Arc<dyn Transcoder>,
    pub manifest: Arc<dyn ManifestSource>,
    pub object_store: Option<Arc<dyn ObjectStore>>,
    pub version_control: Option<Arc<dyn VersionControl>>,
}

impl CoreDependencies {
    /// Construct a dependency bundle for a local-only pass.
    pub fn new(
        filesystem: Arc<dyn FileSystemAccess>,
        transcoder: Arc<dyn Transcoder>,
        manifest: Arc<dyn ManifestSource>,
    ) -> Self {
        Self {
            filesystem,
            transcoder,
            manifest,
            object_store: None,
            version_control: None,
        }
    }

    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    pub fn with_version_control(mut self, vcs: Arc<dyn VersionControl>) -> Self {
        self.version_control = Some(vcs);
        self
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<PipelineConfig>,
    deps: Arc<CoreDependencies>,
}

impl CoreService {
    /// Create a new service from the provided configuration and dependencies.
    pub fn new(config: PipelineConfig, deps: CoreDependencies) -> Self {
        Self {
            config: Arc::new(config),
            deps: Arc::new(deps),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Access the bridge dependencies being used by the service.
    pub fn dependencies(&self) -> Arc<CoreDependencies> {
        Arc::clone(&self.deps)
    }

    /// A coordinator for one pass over the configured trees.
    pub fn coordinator(&self) -> SyncCoordinator {
        let mut coordinator = SyncCoordinator::new(
            self.config.as_ref().clone(),
            self.deps.filesystem.clone(),
            self.deps.manifest.clone(),
            self.deps.transcoder.clone(),
        );
        if let Some(store) = &self.deps.object_store {
            coordinator = coordinator.with_object_store(store.clone());
        }
        if let Some(vcs) = &self.deps.version_control {
            coordinator = coordinator.with_version_control(vcs.clone());
        }
        coordinator
    }

    /// Run one pipeline pass.
    pub async fn run_once(&self) -> Result<RunReport> {
        Ok(self.coordinator().run().await?)
    }
}

/// Logging settings from `ASSET_SYNC_LOG` (an `EnvFilter` directive) and
/// `ASSET_SYNC_LOG_FORMAT` (`pretty`, `json` or `compact`).
pub fn logging_config_from_lookup<F>(lookup: F) -> LoggingConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = LoggingConfig::default();

    if let Some(filter) = lookup("ASSET_SYNC_LOG").filter(|f| !f.trim().is_empty()) {
        config = match filter.trim().to_ascii_lowercase().as_str() {
            "trace" => config.with_level(LogLevel::Trace),
            "debug" => config.with_level(LogLevel::Debug),
            "info" => config.with_level(LogLevel::Info),
            "warn" => config.with_level(LogLevel::Warn),
            "error" => config.with_level(LogLevel::Error),
            _ => config.with_filter(filter),
        };
    }

    if let Some(format) = lookup("ASSET_SYNC_LOG_FORMAT") {
        config = match format.trim().to_ascii_lowercase().as_str() {
            "json" => config.with_format(LogFormat::Json),
            "compact" => config.with_format(LogFormat::Compact),
            "pretty" => config.with_format(LogFormat::Pretty),
            _ => config,
        };
    }

    config
}

/// Logging settings from the process environment.
pub fn logging_config_from_env() -> LoggingConfig {
    logging_config_from_lookup(|key| std::env::var(key).ok())
}

/// Build a service from desktop bridges: Tokio filesystem, CSV manifest,
/// `image`/`ffmpeg` transcoder, B2 when credentials are configured and git
/// when publishing is enabled.
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop(config: PipelineConfig) -> Result<CoreService> {
    use bridge_desktop::{GitPublisher, TokioFileSystem};
    use core_media::MediaTranscoder;
    use core_sync::CsvManifest;

    let filesystem: Arc<dyn FileSystemAccess> = Arc::new(TokioFileSystem::new());
    let manifest = Arc::new(CsvManifest::new(filesystem.clone(), &config.manifest_path));
    let transcoder = Arc::new(MediaTranscoder::from_config(&config));

    let mut deps = CoreDependencies::new(filesystem.clone(), transcoder, manifest);

    if let Some(remote) = &config.remote {
        deps = deps.with_object_store(remote_store(filesystem, remote)?);
    }

    if let Some(vcs) = &config.vcs {
        deps = deps.with_version_control(Arc::new(GitPublisher::new(
            &vcs.repo_dir,
            &vcs.remote,
            &vcs.branch,
            &vcs.commit_message,
        )));
    }

    tracing::debug!(
        remote = deps.object_store.is_some(),
        publish = deps.version_control.is_some(),
        "Bootstrapped desktop service"
    );
    Ok(CoreService::new(config, deps))
}

#[cfg(feature = "backblaze")]
fn remote_store(
    filesystem: Arc<dyn FileSystemAccess>,
    remote: &core_runtime::config::RemoteStoreConfig,
) -> Result<Arc<dyn ObjectStore>> {
    use bridge_desktop::ReqwestHttpClient;
    use provider_backblaze::B2Connector;

    let http_client = ReqwestHttpClient::new()
        .map_err(|err| CoreError::InitializationFailed(err.to_string()))?;
    Ok(Arc::new(B2Connector::new(
        Arc::new(http_client),
        filesystem,
        remote.clone(),
    )))
}

#[cfg(all(feature = "desktop-shims", not(feature = "backblaze")))]
fn remote_store(
    _filesystem: Arc<dyn FileSystemAccess>,
    _remote: &core_runtime::config::RemoteStoreConfig,
) -> Result<Arc<dyn ObjectStore>> {
    Err(core_runtime::Error::CapabilityMissing {
        capability: "remote object store".to_string(),
        message: "built without the `backblaze` feature".to_string(),
    }
    .into())
}
