//! # Host Bridge Traits
//!
//! Capability traits the asset pipeline core depends on, implemented per host.
//!
//! ## Overview
//!
//! This crate defines the contract between the reconciliation engine and the
//! outside world. Each trait represents a capability the core requires but
//! that is supplied by a host crate (`bridge-desktop`) or a provider crate
//! (`provider-backblaze`), so the engine can be exercised against fakes.
//!
//! ## Traits
//!
//! ### Storage
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Source tree, output tree and index file I/O
//! - [`ObjectStore`](storage::ObjectStore) - Remote object store protocol (list / upload / delete)
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP requests for remote store providers
//!
//! ### Publishing
//! - [`VersionControl`](vcs::VersionControl) - Commit and push after a successful run
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LogLevel`](time::LogLevel) - Shared log level for logging configuration
//!
//! ## Implementations
//!
//! | Capability | Implementation Crate |
//! |----------|---------------------|
//! | `FileSystemAccess` | `bridge-desktop` (`TokioFileSystem`) |
//! | `HttpClient` | `bridge-desktop` (`ReqwestHttpClient`) |
//! | `VersionControl` | `bridge-desktop` (`GitPublisher`) |
//! | `ObjectStore` | `provider-backblaze` (`B2Connector`) |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Implementations should:
//!
//! - Convert provider-specific errors to `BridgeError`
//! - Report rejected credentials as `BridgeError::Unauthorized` so callers can
//!   tell a pass-fatal failure from a single-object failure
//! - Include error context (file paths, object names, status codes)
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so they can be shared
//! across the bounded-concurrency workers of the reconciler and syncer.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;
pub mod vcs;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use storage::{DigestAlgorithm, FileMetadata, FileSystemAccess, ObjectStore, RemoteObject};
pub use time::{Clock, LogLevel, SystemClock};
pub use vcs::{PublishOutcome, VersionControl};
