// ABOUTME: Manifest repository trait for committing desired state.
// ABOUTME: Stage, detect changes, commit with an author, and push to a branch.

use crate::backend::process::ProcessError;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

/// Identity used for pipeline commits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

impl Default for CommitAuthor {
    fn default() -> Self {
        Self {
            name: "shipline".to_string(),
            email: "shipline@localhost".to_string(),
        }
    }
}

/// A checked-out repository holding declarative manifests.
#[async_trait]
pub trait ManifestRepo: Send + Sync {
    /// Working tree root.
    fn root(&self) -> &Path;

    async fn stage(&self, path: &Path) -> Result<(), RepoError>;

    async fn has_staged_changes(&self) -> Result<bool, RepoError>;

    /// Commit staged changes, returning the new commit id.
    async fn commit(&self, message: &str, author: &CommitAuthor) -> Result<String, RepoError>;

    async fn push(&self, remote: &str, branch: &str) -> Result<(), RepoError>;
}

/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("push rejected: {0}")]
    PushRejected(String),

    #[error("git command failed: {0}")]
    CommandFailed(String),

    #[error(transparent)]
    Process(#[from] ProcessError),
}
