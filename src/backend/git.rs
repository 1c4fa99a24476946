// ABOUTME: ManifestRepo implementation that drives the git binary.
// ABOUTME: Commits overlay changes and pushes them without rebase or retry.

use super::process::{CommandOutput, ProcessError, Tool};
use super::traits::{CommitAuthor, ManifestRepo, RepoError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Markers in `git push` output meaning the remote refused the update.
const REJECTION_MARKERS: &[&str] = &[
    "[rejected]",
    "non-fast-forward",
    "fetch first",
    "failed to push some refs",
    "protected branch",
];

/// A local git working tree.
#[derive(Debug, Clone)]
pub struct GitRepo {
    tool: Tool,
    root: PathBuf,
}

impl GitRepo {
    pub fn new(program: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            tool: Tool::new(program)
                .timeout(Duration::from_secs(120))
                .current_dir(&root),
            root,
        }
    }

    async fn git(&self, args: &[&str]) -> Result<CommandOutput, RepoError> {
        Ok(self.tool.run(args).await?)
    }

    async fn git_checked(&self, args: &[&str]) -> Result<CommandOutput, RepoError> {
        let output = self.git(args).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(RepoError::CommandFailed(output.failure_message()))
        }
    }

    /// Full id of the checked-out commit.
    pub async fn head_commit(&self) -> Result<String, RepoError> {
        let output = self.git_checked(&["rev-parse", "HEAD"]).await?;
        Ok(output.stdout.trim().to_string())
    }
}

#[async_trait]
impl ManifestRepo for GitRepo {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn stage(&self, path: &Path) -> Result<(), RepoError> {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let relative = relative.display().to_string();
        self.git_checked(&["add", "--", &relative]).await?;
        Ok(())
    }

    async fn has_staged_changes(&self) -> Result<bool, RepoError> {
        let output = self.git(&["diff", "--cached", "--quiet"]).await?;
        match output.exit_code {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(RepoError::CommandFailed(output.failure_message())),
        }
    }

    async fn commit(&self, message: &str, author: &CommitAuthor) -> Result<String, RepoError> {
        let name = format!("user.name={}", author.name);
        let email = format!("user.email={}", author.email);
        self.git_checked(&["-c", &name, "-c", &email, "commit", "-m", message])
            .await?;

        let sha = self.head_commit().await?;
        tracing::info!(commit = %sha, "committed desired state");
        Ok(sha)
    }

    async fn push(&self, remote: &str, branch: &str) -> Result<(), RepoError> {
        let refspec = format!("HEAD:refs/heads/{branch}");
        let output = match self.git(&["push", remote, &refspec]).await {
            Ok(output) => output,
            Err(RepoError::Process(ProcessError::Timeout { timeout, .. })) => {
                return Err(RepoError::CommandFailed(format!(
                    "push timed out after {timeout:?}"
                )));
            }
            Err(e) => return Err(e),
        };

        if output.success() {
            tracing::info!(remote, branch, "pushed desired state");
            return Ok(());
        }

        if REJECTION_MARKERS
            .iter()
            .any(|marker| output.stderr_contains(marker))
        {
            Err(RepoError::PushRejected(output.failure_message()))
        } else {
            Err(RepoError::CommandFailed(output.failure_message()))
        }
    }
}
