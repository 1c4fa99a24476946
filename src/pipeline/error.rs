// ABOUTME: Pipeline error types with the SNAFU pattern.
// ABOUTME: One variant per failure kind; every variant aborts the run.

use serde::Serialize;
use snafu::Snafu;
use std::time::Duration;

use super::connector::ConnectError;
use super::desired_state::ManifestError;
use crate::backend::{BuildError, ClusterError};

/// A fatal pipeline failure.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PipelineError {
    #[snafu(display("missing credentials: {}", names.join(", ")))]
    MissingCredential { names: Vec<String> },

    #[snafu(display("cluster unreachable: {source}"))]
    ClusterUnreachable { source: ConnectError },

    #[snafu(display("{component} not ready within {timeout:?}: {reason}"))]
    ProvisioningTimeout {
        component: String,
        timeout: Duration,
        reason: String,
    },

    #[snafu(display("failed to provision {component}: {source}"))]
    Provisioning {
        component: String,
        source: ClusterError,
    },

    #[snafu(display("image build failed: {source}"))]
    Build { source: BuildError },

    #[snafu(display("image publish failed: {source}"))]
    Publish { source: BuildError },

    #[snafu(display("failed to capture rollback state: {source}"))]
    RollbackCapture { source: ClusterError },

    #[snafu(display("manifest update failed: {source}"))]
    ManifestUpdate { source: ManifestError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineErrorKind {
    MissingCredential,
    ClusterUnreachable,
    ProvisioningTimeout,
    Provisioning,
    Build,
    Publish,
    RollbackCapture,
    ManifestUpdate,
}

impl PipelineError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> PipelineErrorKind {
        match self {
            PipelineError::MissingCredential { .. } => PipelineErrorKind::MissingCredential,
            PipelineError::ClusterUnreachable { .. } => PipelineErrorKind::ClusterUnreachable,
            PipelineError::ProvisioningTimeout { .. } => PipelineErrorKind::ProvisioningTimeout,
            PipelineError::Provisioning { .. } => PipelineErrorKind::Provisioning,
            PipelineError::Build { .. } => PipelineErrorKind::Build,
            PipelineError::Publish { .. } => PipelineErrorKind::Publish,
            PipelineError::RollbackCapture { .. } => PipelineErrorKind::RollbackCapture,
            PipelineError::ManifestUpdate { .. } => PipelineErrorKind::ManifestUpdate,
        }
    }

    /// Whether the image may already be in the registry when this error happened.
    pub fn image_published(&self) -> bool {
        matches!(
            self,
            PipelineError::RollbackCapture { .. } | PipelineError::ManifestUpdate { .. }
        )
    }

    /// Whether the cluster was reachable, so namespace diagnostics are worth collecting.
    pub fn cluster_reachable(&self) -> bool {
        !matches!(
            self,
            PipelineError::MissingCredential { .. } | PipelineError::ClusterUnreachable { .. }
        )
    }
}
