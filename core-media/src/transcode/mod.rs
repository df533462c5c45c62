//! # Transcode Adapter
//!
//! Turns one source asset into its web-optimized published artifact.
//!
//! - Images: decoded, converted to RGB, fitted into a bounding box, re-encoded
//!   as JPEG (CPU work on the blocking pool)
//! - Video: re-encoded by an external `ffmpeg` (H.264 high profile, fixed
//!   frame rate and bitrate, fast-start)
//! - Documents: copied byte for byte
//!
//! The reconciler only sees the [`Transcoder`] trait, so tests substitute
//! counting fakes and mocks.

mod raster;
mod video;

pub use raster::fit_within;
pub use video::{compute_video_dimensions, parse_probe_output};

use crate::asset::SourceAsset;
use crate::error::{MediaError, Result};
use crate::kind::MediaKind;
use async_trait::async_trait;
use core_runtime::config::{ImageSettings, PipelineConfig, VideoSettings};
use core_runtime::logging::strip_path;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// One unit of transcode work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeJob {
    pub source: PathBuf,
    pub output: PathBuf,
    pub kind: MediaKind,
    pub no_resize: bool,
}

impl TranscodeJob {
    pub fn for_asset(asset: &SourceAsset, output_root: &Path) -> Self {
        Self {
            source: asset.path.clone(),
            output: asset.output_path(output_root),
            kind: asset.kind,
            no_resize: asset.no_resize,
        }
    }
}

/// What a successful transcode produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeOutcome {
    Image { width: u32, height: u32 },
    Video { width: u32, height: u32 },
    Copied { bytes: u64 },
}

/// Produces the published artifact for a job, creating parent directories.
///
/// On failure the previously published artifact, if any, is left in place.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, job: &TranscodeJob) -> Result<TranscodeOutcome>;
}

/// Default transcoder backed by the `image` crate and `ffmpeg`.
#[derive(Debug, Clone, Default)]
pub struct MediaTranscoder {
    image: ImageSettings,
    video: VideoSettings,
}

impl MediaTranscoder {
    pub fn new(image: ImageSettings, video: VideoSettings) -> Self {
        Self { image, video }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.image.clone(), config.video.clone())
    }

    async fn copy_document(&self, source: &Path, target: &Path) -> Result<TranscodeOutcome> {
        tokio::fs::metadata(source)
            .await
            .map_err(|e| MediaError::source_read(source, e))?;
        let bytes = tokio::fs::copy(source, target).await?;
        Ok(TranscodeOutcome::Copied { bytes })
    }

    async fn encode(&self, job: &TranscodeJob, target: &Path) -> Result<TranscodeOutcome> {
        match job.kind {
            MediaKind::Image => {
                let settings = self.image.clone();
                let source = job.source.clone();
                let target = target.to_path_buf();
                let no_resize = job.no_resize;
                let (width, height) = tokio::task::spawn_blocking(move || {
                    raster::transcode_image(&source, &target, &settings, no_resize)
                })
                .await
                .map_err(|e| MediaError::transcode(&job.source, format!("worker failed: {}", e)))??;
                Ok(TranscodeOutcome::Image { width, height })
            }
            MediaKind::Video => {
                let (width, height) =
                    video::transcode_video(&job.source, target, &self.video, job.no_resize)
                        .await?;
                Ok(TranscodeOutcome::Video { width, height })
            }
            MediaKind::Document => self.copy_document(&job.source, target).await,
            MediaKind::Unsupported => Err(MediaError::UnsupportedKind(job.source.clone())),
        }
    }
}

#[async_trait]
impl Transcoder for MediaTranscoder {
    #[instrument(skip_all, fields(kind = ?job.kind, source = %strip_path(&job.source)))]
    async fn transcode(&self, job: &TranscodeJob) -> Result<TranscodeOutcome> {
        if !job.kind.is_supported() {
            return Err(MediaError::UnsupportedKind(job.source.clone()));
        }

        if let Some(parent) = job.output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // The published artifact is only replaced by a complete encode.
        let staging = staging_path(&job.output);
        let result = match self.encode(job, &staging).await {
            Ok(outcome) => tokio::fs::rename(&staging, &job.output)
                .await
                .map(|()| outcome)
                .map_err(MediaError::from),
            Err(err) => Err(err),
        };

        match result {
            Ok(outcome) => {
                debug!(output = %strip_path(&job.output), ?outcome, "Transcoded asset");
                Ok(outcome)
            }
            Err(err) => {
                discard_staging(&staging).await;
                Err(err)
            }
        }
    }
}

/// Sibling path an artifact is written to before it replaces `output`.
pub fn staging_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".tmp");
    output.with_file_name(name)
}

async fn discard_staging(staging: &Path) {
    match tokio::fs::remove_file(staging).await {
        Ok(()) => debug!(path = %strip_path(staging), "Discarded partial artifact"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            path = %strip_path(staging),
            error = %e,
            "Failed to discard partial artifact"
        ),
    }
}
