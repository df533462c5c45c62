//! # Backblaze B2 Provider
//!
//! Implements the `ObjectStore` trait for the Backblaze B2 native API.
//!
//! ## Overview
//!
//! This module provides:
//! - Account authorization with an application key, cached per connector
//! - Bucket resolution by name
//! - Paginated listing with SHA-1 content hashes
//! - Uploads through pooled upload URLs, retried on transient failures
//! - File version deletion

pub mod connector;
pub mod error;
pub mod types;

pub use connector::B2Connector;
pub use error::{B2Error, Result};
