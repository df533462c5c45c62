//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the asset pipeline:
//! - Logging and tracing infrastructure
//! - Configuration management (builder, environment loading, validation)
//!
//! ## Overview
//!
//! Every other `core-*` crate depends on this one for its configuration
//! types and logging conventions. The `asset-sync` binary initializes both
//! here before running a pass.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{PipelineConfig, PublishMode};
pub use error::{Error, Result};
