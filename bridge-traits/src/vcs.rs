//! Version Control Publishing
//!
//! The final step of a successful run commits the regenerated output manifest
//! (and any locally published artifacts tracked by the host repository) and
//! pushes it upstream.

use async_trait::async_trait;

use crate::error::Result;

/// Outcome of a publish attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A commit was created and pushed
    Pushed { commit_message: String },
    /// The working tree had no changes; nothing was committed
    NothingToCommit,
}

/// Version control publisher
///
/// # Example
///
/// ```ignore
/// use bridge_traits::vcs::VersionControl;
///
/// async fn publish(vcs: &dyn VersionControl) -> Result<()> {
///     let outcome = vcs.commit_and_push().await?;
///     tracing::info!(?outcome, "Published site changes");
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Stage everything, commit, and push to the configured remote/branch
    async fn commit_and_push(&self) -> Result<PublishOutcome>;
}
