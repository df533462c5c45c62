//! Version Control Implementation using the `git` CLI

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    vcs::{PublishOutcome, VersionControl},
};
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info};

/// Commits and pushes a working tree by shelling out to `git`.
///
/// Requires `git` on `PATH` and credentials for the remote already configured
/// (credential helper or SSH agent).
#[derive(Debug, Clone)]
pub struct GitPublisher {
    repo_dir: PathBuf,
    remote: String,
    branch: String,
    message: String,
}

impl GitPublisher {
    pub fn new(
        repo_dir: impl Into<PathBuf>,
        remote: impl Into<String>,
        branch: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            remote: remote.into(),
            branch: branch.into(),
            message: message.into(),
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    async fn git(&self, args: &[&str]) -> Result<Output> {
        debug!(repo = ?self.repo_dir, ?args, "Running git");
        Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .await
            .map_err(|e| BridgeError::NotAvailable(format!("Failed to run git: {}", e)))
    }

    async fn git_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.git(args).await?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(command_failure(args, &output))
        }
    }
}

fn command_failure(args: &[&str], output: &Output) -> BridgeError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    BridgeError::OperationFailed(format!(
        "git {} failed ({}): {}",
        args.join(" "),
        output.status,
        stderr.trim()
    ))
}

/// `git commit` exits non-zero on a clean tree; tell that apart from a real
/// failure by its output.
fn is_nothing_to_commit(stdout: &[u8], stderr: &[u8]) -> bool {
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(stdout),
        String::from_utf8_lossy(stderr)
    );
    text.contains("nothing to commit") || text.contains("no changes added to commit")
}

#[async_trait]
impl VersionControl for GitPublisher {
    async fn commit_and_push(&self) -> Result<PublishOutcome> {
        self.git_checked(&["add", "-A"]).await?;

        let commit_args = ["commit", "-m", self.message.as_str()];
        let commit = self.git(&commit_args).await?;
        if !commit.status.success() {
            if is_nothing_to_commit(&commit.stdout, &commit.stderr) {
                info!(repo = ?self.repo_dir, "Working tree clean, nothing to publish");
                return Ok(PublishOutcome::NothingToCommit);
            }
            return Err(command_failure(&commit_args, &commit));
        }

        self.git_checked(&["push", self.remote.as_str(), self.branch.as_str()])
            .await?;

        info!(
            repo = ?self.repo_dir,
            remote = %self.remote,
            branch = %self.branch,
            "Changes committed and pushed"
        );
        Ok(PublishOutcome::Pushed {
            commit_message: self.message.clone(),
        })
    }
}
