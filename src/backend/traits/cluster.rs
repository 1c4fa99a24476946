// ABOUTME: Cluster operations trait for the target Kubernetes namespace.
// ABOUTME: Connectivity probes, workload queries, manifest apply, and readiness waits.

use crate::backend::process::ProcessError;
use crate::types::ResourceName;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Workload kinds the pipeline reads or provisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadKind {
    #[default]
    StatefulSet,
    Deployment,
}

impl WorkloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::StatefulSet => "statefulset",
            WorkloadKind::Deployment => "deployment",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded check that a provisioned workload is serving.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReadinessProbe {
    /// Pod label selector, e.g. `app=postgres`.
    pub selector: String,
    #[serde(default = "default_condition")]
    pub condition: String,
}

fn default_condition() -> String {
    "ready".to_string()
}

impl ReadinessProbe {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            condition: default_condition(),
        }
    }
}

/// Outcome of waiting on a readiness probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Readiness {
    Ready,
    /// Not ready within the bound. The run may continue.
    Degraded { reason: String },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

/// Live state of one workload, for failure diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadStatus {
    pub kind: WorkloadKind,
    pub name: String,
    pub desired: u32,
    pub ready: u32,
    pub images: Vec<String>,
}

/// Every statefulset and deployment in a namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NamespaceStatus {
    pub namespace: String,
    pub workloads: Vec<WorkloadStatus>,
}

/// Operations against the target cluster.
#[async_trait]
pub trait ClusterOps: Send + Sync {
    /// Read-only control plane probe.
    async fn cluster_info(&self) -> Result<String, ClusterError>;

    /// Names of the nodes visible with the current credentials.
    async fn node_names(&self) -> Result<Vec<String>, ClusterError>;

    /// Create the namespace if it does not exist.
    async fn ensure_namespace(&self, namespace: &ResourceName) -> Result<(), ClusterError>;

    async fn workload_exists(
        &self,
        namespace: &ResourceName,
        kind: WorkloadKind,
        name: &ResourceName,
    ) -> Result<bool, ClusterError>;

    /// Declaratively apply a manifest file into the namespace.
    async fn apply_manifest(
        &self,
        namespace: &ResourceName,
        manifest: &Path,
    ) -> Result<(), ClusterError>;

    /// Wait up to `timeout` for pods matching the probe.
    async fn wait_ready(
        &self,
        namespace: &ResourceName,
        probe: &ReadinessProbe,
        timeout: Duration,
    ) -> Result<Readiness, ClusterError>;

    /// Image of the workload's first container, `None` if the workload is absent.
    async fn live_image(
        &self,
        namespace: &ResourceName,
        kind: WorkloadKind,
        name: &ResourceName,
    ) -> Result<Option<String>, ClusterError>;

    async fn namespace_status(
        &self,
        namespace: &ResourceName,
    ) -> Result<NamespaceStatus, ClusterError>;
}

/// Errors from cluster operations.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("cluster command failed: {0}")]
    CommandFailed(String),

    #[error("unexpected cluster output: {0}")]
    InvalidOutput(String),

    #[error(transparent)]
    Process(#[from] ProcessError),
}
