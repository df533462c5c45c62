//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides production-ready implementations of the bridge traits
//! the asset pipeline needs:
//! - `FileSystemAccess` using `tokio::fs` (recursive walks via `walkdir`)
//! - `HttpClient` using `reqwest`
//! - `VersionControl` by driving the `git` command line
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{GitPublisher, ReqwestHttpClient, TokioFileSystem};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let fs = TokioFileSystem::new();
//!     let git = GitPublisher::new("./app", "origin", "main", "Automated commit");
//!
//!     // Use in pipeline wiring
//!     Ok(())
//! }
//! ```

mod filesystem;
mod git;
mod http;

pub use filesystem::TokioFileSystem;
pub use git::GitPublisher;
pub use http::ReqwestHttpClient;
