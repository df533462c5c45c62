//! Workspace placeholder crate.
//!
//! This crate exposes feature flags that map to the individual workspace
//! crates (`core-service`, `core-sync`, `core-media`). Hosts can depend on
//! `asset-sync-workspace` and enable the documented features without wiring
//! each crate individually.
//!
//! - `desktop-shims` (default): full pipeline with desktop bridges.
//! - `backblaze`: adds the Backblaze B2 remote store.
//! - `engine-only`: just the reconciliation engine and media adapters.

#[cfg(any(feature = "desktop-shims", feature = "backblaze"))]
pub use core_service as service;

#[cfg(feature = "engine-only")]
pub use core_media as media;
#[cfg(feature = "engine-only")]
pub use core_sync as sync;
