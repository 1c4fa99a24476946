// ABOUTME: Desired-state updater: pins the new image in the overlay and pushes it.
// ABOUTME: No commit is made when the overlay already names the version; HEAD is still pushed.

use serde::Serialize;
use thiserror::Error;

use crate::backend::{ManifestRepo, RepoError};
use crate::config::Config;

use super::identity::BuildIdentity;
use super::overlay::{Overlay, OverlayError};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl ManifestError {
    /// The remote refused the push, e.g. after a concurrent update.
    pub fn is_push_rejected(&self) -> bool {
        matches!(self, ManifestError::Repo(RepoError::PushRejected(_)))
    }
}

/// Result of the desired-state update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ManifestChange {
    Committed { commit: String, message: String },
    Unchanged,
}

impl ManifestChange {
    pub fn commit(&self) -> Option<&str> {
        match self {
            ManifestChange::Committed { commit, .. } => Some(commit),
            ManifestChange::Unchanged => None,
        }
    }
}

/// `deploy(<namespace>): <image> <marker>`.
pub fn commit_message(namespace: &str, image: &str, skip_marker: &str) -> String {
    format!("deploy({namespace}): {image} {skip_marker}")
}

/// Pin `identity` in the overlay, commit, and push to the target branch.
pub async fn update<R>(
    repo: &R,
    config: &Config,
    identity: &BuildIdentity,
) -> Result<ManifestChange, ManifestError>
where
    R: ManifestRepo + ?Sized,
{
    let path = repo.root().join(&config.manifest.overlay);
    let mut overlay = Overlay::load(&path)?;

    let image_name = config.overlay_image_name();
    let new_name = identity.full_image_ref().repository();
    let changed = overlay.set_image(image_name, &new_name, identity.version_tag())?;

    if !changed {
        tracing::info!(
            overlay = %path.display(),
            tag = identity.version_tag(),
            "overlay already pins this version"
        );
        // A previous run may have committed without getting the push through.
        push(repo, config).await?;
        return Ok(ManifestChange::Unchanged);
    }

    overlay.save()?;
    repo.stage(&config.manifest.overlay).await?;

    if !repo.has_staged_changes().await? {
        tracing::info!(overlay = %path.display(), "nothing to commit");
        push(repo, config).await?;
        return Ok(ManifestChange::Unchanged);
    }

    let message = commit_message(
        config.cluster.namespace.as_str(),
        &identity.full_image_ref().to_string(),
        &config.manifest.skip_marker,
    );
    let commit = repo.commit(&message, &config.manifest.author).await?;
    tracing::info!(commit = %commit, "desired state committed");

    push(repo, config).await?;

    Ok(ManifestChange::Committed { commit, message })
}

/// Push `HEAD` to the target branch. A no-op when the remote is current.
async fn push<R>(repo: &R, config: &Config) -> Result<(), ManifestError>
where
    R: ManifestRepo + ?Sized,
{
    repo.push(&config.manifest.remote, &config.manifest.branch)
        .await?;
    tracing::info!(
        remote = %config.manifest.remote,
        branch = %config.manifest.branch,
        "desired state pushed"
    );
    Ok(())
}
