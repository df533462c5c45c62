//! # Core Media
//!
//! Asset identity, media-kind classification and transcoding for the asset
//! pipeline.
//!
//! ## Modules
//!
//! - [`identity`]: canonical identities shared by the source tree, the local
//!   published tree and the remote store
//! - [`kind`]: the closed [`MediaKind`] classification
//! - [`asset`]: [`SourceAsset`], a classified source file
//! - [`transcode`]: the [`Transcoder`] trait and its default
//!   [`MediaTranscoder`]

pub mod asset;
pub mod error;
pub mod identity;
pub mod kind;
pub mod transcode;

pub use asset::SourceAsset;
pub use error::{MediaError, Result};
pub use identity::{published_identity, source_identity, AssetIdentity, AssetPath};
pub use kind::MediaKind;
pub use transcode::{MediaTranscoder, TranscodeJob, TranscodeOutcome, Transcoder};
