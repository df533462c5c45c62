//! # Pipeline Configuration Module
//!
//! Provides configuration management for the asset synchronization pipeline.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! [`PipelineConfig`] holding every path, tuning knob and optional
//! collaborator setting the pipeline needs. It enforces fail-fast validation
//! so that a misconfigured run never touches the output tree.
//!
//! ## Sources
//!
//! - [`PipelineConfig::builder`] for programmatic construction (tests, hosts)
//! - [`PipelineConfig::from_env`] for the `asset-sync` binary, reading
//!   `ASSET_SYNC_*` variables plus the Backblaze variables
//!   (`B2_APPLICATION_KEY_ID`, `B2_APPLICATION_KEY`, `B2_BUCKET_NAME`,
//!   `CDN_BASE_URL`)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{PipelineConfig, PublishMode};
//!
//! let config = PipelineConfig::builder()
//!     .source_root("./original_content")
//!     .output_root("./app/web_content")
//!     .manifest_path("./projects.csv")
//!     .publish_mode(PublishMode::Local { base_path: "web_content".into() })
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::PipelineConfig;
//!
//! // Zero concurrency is rejected with an actionable message
//! let config = PipelineConfig::builder()
//!     .transcode_concurrency(0)
//!     .build()
//!     .expect("Should fail - transcode concurrency must be positive");
//! ```

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Default marker token that disables resizing when present in a basename.
pub const DEFAULT_NO_RESIZE_MARKER: &str = "NR=";

/// Default name of the per-row subfolder holding publishable assets.
pub const DEFAULT_PUBLIC_SUBFOLDER: &str = "PUBLIC";

/// How published artifacts are addressed in the output manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishMode {
    /// Served next to the site, e.g. `web_content/<name>`
    Local { base_path: String },
    /// Served from the remote store / CDN, e.g. `https://cdn.example/<name>`
    Remote { base_url: String },
}

impl PublishMode {
    /// URL (or site-relative path) for a published artifact name.
    pub fn url_for(&self, published_name: &str) -> String {
        let base = match self {
            PublishMode::Local { base_path } => base_path,
            PublishMode::Remote { base_url } => base_url,
        };
        let base = base.trim_end_matches('/');
        if base.is_empty() {
            published_name.to_string()
        } else {
            format!("{}/{}", base, published_name)
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, PublishMode::Remote { .. })
    }
}

impl Default for PublishMode {
    fn default() -> Self {
        PublishMode::Local {
            base_path: "web_content".to_string(),
        }
    }
}

/// Image transcode settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSettings {
    /// Bounding box width; larger images are downscaled to fit
    pub max_width: u32,
    /// Bounding box height
    pub max_height: u32,
    /// JPEG quality, 1..=100
    pub jpeg_quality: u8,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            max_width: 1000,
            max_height: 1000,
            jpeg_quality: 85,
        }
    }
}

/// Video transcode settings
///
/// Encoding itself is delegated to `ffmpeg`; dimensions are read with
/// `ffprobe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSettings {
    pub max_width: u32,
    pub max_height: u32,
    pub frame_rate: u32,
    /// ffmpeg bitrate string, e.g. `4000k`
    pub bitrate: String,
    /// x264 preset
    pub preset: String,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            max_width: 1280,
            max_height: 720,
            frame_rate: 18,
            bitrate: "4000k".to_string(),
            preset: "ultrafast".to_string(),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
        }
    }
}

/// Bounded parallelism for the two phases that fan out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyLimits {
    /// Concurrent transcodes during local reconciliation
    pub transcode: usize,
    /// Concurrent remote operations during remote sync
    pub upload: usize,
}

impl Default for ConcurrencyLimits {
    fn default() -> Self {
        Self {
            transcode: 2,
            upload: 4,
        }
    }
}

/// Remote object store credentials (Backblaze B2).
///
/// Credentials never appear in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteStoreConfig {
    pub key_id: String,
    pub application_key: String,
    pub bucket_name: String,
}

impl std::fmt::Debug for RemoteStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStoreConfig")
            .field("key_id", &crate::logging::mask_secret(&self.key_id))
            .field("application_key", &"[REDACTED]")
            .field("bucket_name", &self.bucket_name)
            .finish()
    }
}

/// Version control publish settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsConfig {
    pub repo_dir: PathBuf,
    pub remote: String,
    pub branch: String,
    pub commit_message: String,
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self {
            repo_dir: PathBuf::from("./app"),
            remote: "origin".to_string(),
            branch: "main".to_string(),
            commit_message: "Automated commit".to_string(),
        }
    }
}

/// Configuration for one pipeline pass.
///
/// Use [`PipelineConfigBuilder`] to construct instances.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the source media tree
    pub source_root: PathBuf,
    /// Root of the local published tree
    pub output_root: PathBuf,
    /// CSV manifest describing the rows
    pub manifest_path: PathBuf,
    /// Output JSON manifest consumed by the site
    pub output_manifest_path: PathBuf,
    /// Fingerprint Store document
    pub fingerprint_path: PathBuf,
    /// Per-row subfolder holding the publishable assets
    pub public_subfolder: String,
    /// Basename token that disables resizing
    pub no_resize_marker: String,
    pub publish_mode: PublishMode,
    pub image: ImageSettings,
    pub video: VideoSettings,
    pub concurrency: ConcurrencyLimits,
    /// Remote store; `None` skips the remote phase
    pub remote: Option<RemoteStoreConfig>,
    /// Version control publisher; `None` skips the publish step
    pub vcs: Option<VcsConfig>,
}

impl PipelineConfig {
    /// Creates a new builder for constructing a `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Loads configuration from the process environment.
    ///
    /// | Variable | Meaning |
    /// |---|---|
    /// | `ASSET_SYNC_SOURCE_ROOT` | source tree |
    /// | `ASSET_SYNC_OUTPUT_ROOT` | local published tree |
    /// | `ASSET_SYNC_MANIFEST` | CSV manifest |
    /// | `ASSET_SYNC_OUTPUT_MANIFEST` | output JSON manifest |
    /// | `ASSET_SYNC_FINGERPRINTS` | fingerprint store |
    /// | `ASSET_SYNC_PUBLIC_SUBFOLDER` | per-row subfolder |
    /// | `ASSET_SYNC_BASE_PATH` | local publish base path |
    /// | `ASSET_SYNC_REMOTE_URLS` | `true` publishes CDN URLs |
    /// | `ASSET_SYNC_UPLOAD` | `false` skips the remote phase |
    /// | `ASSET_SYNC_TRANSCODE_CONCURRENCY` / `ASSET_SYNC_UPLOAD_CONCURRENCY` | limits |
    /// | `ASSET_SYNC_GIT_REPO` / `_REMOTE` / `_BRANCH` / `_MESSAGE` | publisher |
    /// | `ASSET_SYNC_GIT_PUSH` | `false` skips the publish step |
    /// | `ASSET_SYNC_FFMPEG` / `ASSET_SYNC_FFPROBE` | binaries |
    /// | `B2_APPLICATION_KEY_ID`, `B2_APPLICATION_KEY`, `B2_BUCKET_NAME` | remote store |
    /// | `CDN_BASE_URL` | base URL when publishing remote URLs |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut builder = PipelineConfig::builder();

        if let Some(v) = var("ASSET_SYNC_SOURCE_ROOT") {
            builder = builder.source_root(v);
        }
        if let Some(v) = var("ASSET_SYNC_OUTPUT_ROOT") {
            builder = builder.output_root(v);
        }
        if let Some(v) = var("ASSET_SYNC_MANIFEST") {
            builder = builder.manifest_path(v);
        }
        if let Some(v) = var("ASSET_SYNC_OUTPUT_MANIFEST") {
            builder = builder.output_manifest_path(v);
        }
        if let Some(v) = var("ASSET_SYNC_FINGERPRINTS") {
            builder = builder.fingerprint_path(v);
        }
        if let Some(v) = var("ASSET_SYNC_PUBLIC_SUBFOLDER") {
            builder = builder.public_subfolder(v);
        }
        if let Some(v) = var("ASSET_SYNC_TRANSCODE_CONCURRENCY") {
            builder = builder.transcode_concurrency(parse_number(
                "ASSET_SYNC_TRANSCODE_CONCURRENCY",
                &v,
            )?);
        }
        if let Some(v) = var("ASSET_SYNC_UPLOAD_CONCURRENCY") {
            builder =
                builder.upload_concurrency(parse_number("ASSET_SYNC_UPLOAD_CONCURRENCY", &v)?);
        }

        let mut video = VideoSettings::default();
        if let Some(v) = var("ASSET_SYNC_FFMPEG") {
            video.ffmpeg_path = PathBuf::from(v);
        }
        if let Some(v) = var("ASSET_SYNC_FFPROBE") {
            video.ffprobe_path = PathBuf::from(v);
        }
        builder = builder.video(video);

        let remote_urls = match var("ASSET_SYNC_REMOTE_URLS") {
            Some(v) => parse_flag("ASSET_SYNC_REMOTE_URLS", &v)?,
            None => false,
        };
        if remote_urls {
            let base_url = var("CDN_BASE_URL").ok_or_else(|| {
                Error::Config(
                    "ASSET_SYNC_REMOTE_URLS is set but CDN_BASE_URL is missing".to_string(),
                )
            })?;
            builder = builder.publish_mode(PublishMode::Remote { base_url });
        } else if let Some(base_path) = var("ASSET_SYNC_BASE_PATH") {
            builder = builder.publish_mode(PublishMode::Local { base_path });
        }

        let upload = match var("ASSET_SYNC_UPLOAD") {
            Some(v) => parse_flag("ASSET_SYNC_UPLOAD", &v)?,
            None => true,
        };
        if upload {
            let key_id = var("B2_APPLICATION_KEY_ID");
            let application_key = var("B2_APPLICATION_KEY");
            let bucket_name = var("B2_BUCKET_NAME");
            match (key_id, application_key, bucket_name) {
                (Some(key_id), Some(application_key), Some(bucket_name)) => {
                    builder = builder.remote(RemoteStoreConfig {
                        key_id,
                        application_key,
                        bucket_name,
                    });
                }
                (None, None, None) => {}
                _ => {
                    return Err(Error::Config(
                        "Incomplete Backblaze credentials: set all of B2_APPLICATION_KEY_ID, \
                         B2_APPLICATION_KEY and B2_BUCKET_NAME, or none of them"
                            .to_string(),
                    ))
                }
            }
        }

        let push = match var("ASSET_SYNC_GIT_PUSH") {
            Some(v) => parse_flag("ASSET_SYNC_GIT_PUSH", &v)?,
            None => true,
        };
        if push {
            let mut vcs = VcsConfig::default();
            if let Some(v) = var("ASSET_SYNC_GIT_REPO") {
                vcs.repo_dir = PathBuf::from(v);
            }
            if let Some(v) = var("ASSET_SYNC_GIT_REMOTE") {
                vcs.remote = v;
            }
            if let Some(v) = var("ASSET_SYNC_GIT_BRANCH") {
                vcs.branch = v;
            }
            if let Some(v) = var("ASSET_SYNC_GIT_MESSAGE") {
                vcs.commit_message = v;
            }
            builder = builder.vcs(vcs);
        }

        builder.build()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Paths are not empty
    /// - The fingerprint store and output manifest are not the same file
    /// - Concurrency limits are positive
    /// - Transcode settings are in range
    /// - Remote credentials are complete, and remote URLs have a base URL
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("Source root", &self.source_root),
            ("Output root", &self.output_root),
            ("Manifest path", &self.manifest_path),
            ("Output manifest path", &self.output_manifest_path),
            ("Fingerprint path", &self.fingerprint_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(Error::Config(format!("{} cannot be empty", name)));
            }
        }

        if self.fingerprint_path == self.output_manifest_path {
            return Err(Error::Config(
                "Fingerprint store and output manifest must be different files".to_string(),
            ));
        }

        if self.no_resize_marker.is_empty() {
            return Err(Error::Config("No-resize marker cannot be empty".to_string()));
        }

        if self.concurrency.transcode == 0 {
            return Err(Error::Config(
                "Transcode concurrency must be greater than 0".to_string(),
            ));
        }

        if self.concurrency.upload == 0 {
            return Err(Error::Config(
                "Upload concurrency must be greater than 0".to_string(),
            ));
        }

        if self.image.max_width == 0 || self.image.max_height == 0 {
            return Err(Error::Config(
                "Image bounding box must be at least 1x1".to_string(),
            ));
        }

        if !(1..=100).contains(&self.image.jpeg_quality) {
            return Err(Error::Config(
                "JPEG quality must be between 1 and 100".to_string(),
            ));
        }

        if self.video.max_width < 2 || self.video.max_height < 2 {
            return Err(Error::Config(
                "Video bounds must be at least 2x2".to_string(),
            ));
        }

        if self.video.frame_rate == 0 {
            return Err(Error::Config(
                "Video frame rate must be greater than 0".to_string(),
            ));
        }

        if let PublishMode::Remote { base_url } = &self.publish_mode {
            if base_url.trim().is_empty() {
                return Err(Error::Config(
                    "Remote publish mode requires a base URL".to_string(),
                ));
            }
        }

        if let Some(remote) = &self.remote {
            if remote.key_id.is_empty()
                || remote.application_key.is_empty()
                || remote.bucket_name.is_empty()
            {
                return Err(Error::Config(
                    "Remote store credentials and bucket name cannot be empty".to_string(),
                ));
            }
        }

        if let Some(vcs) = &self.vcs {
            if vcs.remote.is_empty() || vcs.branch.is_empty() {
                return Err(Error::Config(
                    "Git remote and branch cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a positive integer, got '{}'", key, value)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!(
            "{} must be a boolean (true/false), got '{}'",
            key, value
        ))),
    }
}

/// Builder for constructing [`PipelineConfig`] instances.
///
/// Unset paths fall back to the conventional project layout
/// (`./original_content`, `./app/web_content`, `./projects.csv`,
/// `./app/public/assets/projects.json`, `./hashed_mirror.json`).
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    source_root: Option<PathBuf>,
    output_root: Option<PathBuf>,
    manifest_path: Option<PathBuf>,
    output_manifest_path: Option<PathBuf>,
    fingerprint_path: Option<PathBuf>,
    public_subfolder: Option<String>,
    no_resize_marker: Option<String>,
    publish_mode: Option<PublishMode>,
    image: Option<ImageSettings>,
    video: Option<VideoSettings>,
    concurrency: ConcurrencyLimits,
    remote: Option<RemoteStoreConfig>,
    vcs: Option<VcsConfig>,
}

impl PipelineConfigBuilder {
    pub fn source_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.source_root = Some(path.into());
        self
    }

    pub fn output_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output_root = Some(path.into());
        self
    }

    pub fn manifest_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.manifest_path = Some(path.into());
        self
    }

    pub fn output_manifest_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output_manifest_path = Some(path.into());
        self
    }

    pub fn fingerprint_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.fingerprint_path = Some(path.into());
        self
    }

    /// Sets the per-row subfolder name.
    ///
    /// Default: `PUBLIC`. An empty string uses the row folder itself.
    pub fn public_subfolder(mut self, name: impl Into<String>) -> Self {
        self.public_subfolder = Some(name.into());
        self
    }

    /// Default: `NR=`
    pub fn no_resize_marker(mut self, marker: impl Into<String>) -> Self {
        self.no_resize_marker = Some(marker.into());
        self
    }

    pub fn publish_mode(mut self, mode: PublishMode) -> Self {
        self.publish_mode = Some(mode);
        self
    }

    pub fn image(mut self, settings: ImageSettings) -> Self {
        self.image = Some(settings);
        self
    }

    pub fn video(mut self, settings: VideoSettings) -> Self {
        self.video = Some(settings);
        self
    }

    /// Default: 2
    pub fn transcode_concurrency(mut self, limit: usize) -> Self {
        self.concurrency.transcode = limit;
        self
    }

    /// Default: 4
    pub fn upload_concurrency(mut self, limit: usize) -> Self {
        self.concurrency.upload = limit;
        self
    }

    /// Enables the remote phase.
    pub fn remote(mut self, remote: RemoteStoreConfig) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Enables the version control publish step.
    pub fn vcs(mut self, vcs: VcsConfig) -> Self {
        self.vcs = Some(vcs);
        self
    }

    /// Builds the final `PipelineConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when [`PipelineConfig::validate`] fails.
    pub fn build(self) -> Result<PipelineConfig> {
        let config = PipelineConfig {
            source_root: self
                .source_root
                .unwrap_or_else(|| PathBuf::from("./original_content")),
            output_root: self
                .output_root
                .unwrap_or_else(|| PathBuf::from("./app/web_content")),
            manifest_path: self
                .manifest_path
                .unwrap_or_else(|| PathBuf::from("./projects.csv")),
            output_manifest_path: self
                .output_manifest_path
                .unwrap_or_else(|| PathBuf::from("./app/public/assets/projects.json")),
            fingerprint_path: self
                .fingerprint_path
                .unwrap_or_else(|| PathBuf::from("./hashed_mirror.json")),
            public_subfolder: self
                .public_subfolder
                .unwrap_or_else(|| DEFAULT_PUBLIC_SUBFOLDER.to_string()),
            no_resize_marker: self
                .no_resize_marker
                .unwrap_or_else(|| DEFAULT_NO_RESIZE_MARKER.to_string()),
            publish_mode: self.publish_mode.unwrap_or_default(),
            image: self.image.unwrap_or_default(),
            video: self.video.unwrap_or_default(),
            concurrency: self.concurrency,
            remote: self.remote,
            vcs: self.vcs,
        };

        config.validate()?;

        Ok(config)
    }
}
