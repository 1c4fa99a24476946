// ABOUTME: Cluster connector: scoped kubeconfig plus a bounded read-only probe.
// ABOUTME: Any failure here means the cluster is unreachable for this run.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::backend::{ClusterError, ClusterOps, KubeconfigError, KubeconfigFile};

use super::context::ExecutionContext;

/// Why the cluster could not be reached.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Credentials(#[from] KubeconfigError),

    #[error("connectivity probe failed: {0}")]
    Probe(#[from] ClusterError),

    #[error("connectivity probe did not answer within {0:?}")]
    Timeout(Duration),

    #[error("no nodes visible with the supplied credentials")]
    NoNodes,
}

/// What the probe saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterSummary {
    pub control_plane: String,
    pub nodes: Vec<String>,
}

/// Write the context's cluster credentials to a scoped kubeconfig file.
pub fn materialize_kubeconfig(
    context: &ExecutionContext,
) -> Result<KubeconfigFile, ConnectError> {
    Ok(KubeconfigFile::materialize(context.cluster_credentials())?)
}

/// Probe the control plane and list nodes, both within `timeout`.
pub async fn verify<C>(cluster: &C, timeout: Duration) -> Result<ClusterSummary, ConnectError>
where
    C: ClusterOps + ?Sized,
{
    let probe = async {
        let control_plane = cluster.cluster_info().await?;
        let nodes = cluster.node_names().await?;
        Ok::<_, ClusterError>(ClusterSummary {
            control_plane,
            nodes,
        })
    };

    let summary = tokio::time::timeout(timeout, probe)
        .await
        .map_err(|_| ConnectError::Timeout(timeout))??;

    if summary.nodes.is_empty() {
        return Err(ConnectError::NoNodes);
    }

    tracing::info!(
        control_plane = %summary.control_plane,
        nodes = summary.nodes.len(),
        "cluster reachable"
    );
    Ok(summary)
}
