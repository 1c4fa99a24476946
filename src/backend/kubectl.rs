// ABOUTME: ClusterOps implementation that drives the kubectl binary.
// ABOUTME: Every call is scoped to an explicit kubeconfig and namespace.

use super::process::{CommandOutput, Tool};
use super::traits::{
    ClusterError, ClusterOps, NamespaceStatus, Readiness, ReadinessProbe, WorkloadKind,
    WorkloadStatus,
};
use crate::types::ResourceName;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

/// Extra time granted to the kubectl process beyond its own `--timeout`.
const WAIT_GRACE: Duration = Duration::from_secs(15);

/// Delay before re-checking when no pods match a probe yet.
const NO_PODS_RETRY: Duration = Duration::from_secs(5);

/// Cluster access through `kubectl --kubeconfig <path>`.
#[derive(Debug, Clone)]
pub struct KubectlCluster {
    tool: Tool,
    kubeconfig: PathBuf,
}

impl KubectlCluster {
    pub fn new(program: impl Into<PathBuf>, kubeconfig: impl Into<PathBuf>) -> Self {
        Self {
            tool: Tool::new(program).timeout(Duration::from_secs(60)),
            kubeconfig: kubeconfig.into(),
        }
    }

    /// Timeout for single request-style calls (get, apply, create).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.tool = self.tool.timeout(timeout);
        self
    }

    pub fn kubeconfig(&self) -> &Path {
        &self.kubeconfig
    }

    fn args(&self, rest: &[&str]) -> Vec<String> {
        let mut args = vec![
            "--kubeconfig".to_string(),
            self.kubeconfig.display().to_string(),
        ];
        args.extend(rest.iter().map(|s| s.to_string()));
        args
    }

    async fn kubectl(&self, rest: &[&str]) -> Result<CommandOutput, ClusterError> {
        Ok(self.tool.run(self.args(rest)).await?)
    }

    async fn kubectl_checked(&self, rest: &[&str]) -> Result<CommandOutput, ClusterError> {
        let output = self.kubectl(rest).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(ClusterError::CommandFailed(output.failure_message()))
        }
    }
}

fn is_not_found(output: &CommandOutput) -> bool {
    output.stderr_contains("notfound") || output.stderr_contains("not found")
}

#[async_trait]
impl ClusterOps for KubectlCluster {
    async fn cluster_info(&self) -> Result<String, ClusterError> {
        let output = self.kubectl_checked(&["cluster-info"]).await?;
        Ok(output
            .stdout
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    async fn node_names(&self) -> Result<Vec<String>, ClusterError> {
        let output = self.kubectl_checked(&["get", "nodes", "-o", "name"]).await?;
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| l.trim_start_matches("node/").to_string())
            .collect())
    }

    async fn ensure_namespace(&self, namespace: &ResourceName) -> Result<(), ClusterError> {
        let ns = namespace.as_str();
        let output = self.kubectl(&["get", "namespace", ns, "-o", "name"]).await?;
        if output.success() {
            return Ok(());
        }
        if !is_not_found(&output) {
            return Err(ClusterError::CommandFailed(output.failure_message()));
        }

        tracing::info!(namespace = ns, "creating namespace");
        let output = self.kubectl(&["create", "namespace", ns]).await?;
        // Another run may have created it between the check and the create.
        if output.success() || output.stderr_contains("alreadyexists") {
            Ok(())
        } else {
            Err(ClusterError::CommandFailed(output.failure_message()))
        }
    }

    async fn workload_exists(
        &self,
        namespace: &ResourceName,
        kind: WorkloadKind,
        name: &ResourceName,
    ) -> Result<bool, ClusterError> {
        let output = self
            .kubectl(&[
                "get",
                kind.as_str(),
                name.as_str(),
                "-n",
                namespace.as_str(),
                "-o",
                "name",
            ])
            .await?;

        if output.success() {
            Ok(true)
        } else if is_not_found(&output) {
            Ok(false)
        } else {
            Err(ClusterError::CommandFailed(output.failure_message()))
        }
    }

    async fn apply_manifest(
        &self,
        namespace: &ResourceName,
        manifest: &Path,
    ) -> Result<(), ClusterError> {
        let manifest = manifest.display().to_string();
        let output = self
            .kubectl_checked(&["apply", "-n", namespace.as_str(), "-f", &manifest])
            .await?;
        tracing::debug!(output = %output.stdout.trim(), "manifest applied");
        Ok(())
    }

    async fn wait_ready(
        &self,
        namespace: &ResourceName,
        probe: &ReadinessProbe,
        timeout: Duration,
    ) -> Result<Readiness, ClusterError> {
        let deadline = Instant::now() + timeout;
        let condition = format!("--for=condition={}", probe.condition);

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(Readiness::Degraded {
                    reason: format!(
                        "pods matching {} not {} within {:?}",
                        probe.selector, probe.condition, timeout
                    ),
                });
            }

            let wait_timeout = format!("--timeout={}s", remaining.as_secs().max(1));
            let args = self.args(&[
                "wait",
                &condition,
                "pod",
                "-l",
                &probe.selector,
                "-n",
                namespace.as_str(),
                &wait_timeout,
            ]);

            let output = match self
                .tool
                .run_with_timeout(args, remaining + WAIT_GRACE)
                .await
            {
                Ok(output) => output,
                Err(crate::backend::process::ProcessError::Timeout { timeout, .. }) => {
                    return Ok(Readiness::Degraded {
                        reason: format!("kubectl wait did not return within {timeout:?}"),
                    });
                }
                Err(e) => return Err(e.into()),
            };

            if output.success() {
                return Ok(Readiness::Ready);
            }

            // Pods may not be scheduled yet right after apply.
            if output.stderr_contains("no matching resources") {
                let pause = NO_PODS_RETRY.min(deadline.saturating_duration_since(Instant::now()));
                tokio::time::sleep(pause).await;
                continue;
            }

            return Ok(Readiness::Degraded {
                reason: output.failure_message(),
            });
        }
    }

    async fn live_image(
        &self,
        namespace: &ResourceName,
        kind: WorkloadKind,
        name: &ResourceName,
    ) -> Result<Option<String>, ClusterError> {
        let output = self
            .kubectl(&[
                "get",
                kind.as_str(),
                name.as_str(),
                "-n",
                namespace.as_str(),
                "-o",
                "jsonpath={.spec.template.spec.containers[0].image}",
            ])
            .await?;

        if output.success() {
            let image = output.stdout.trim();
            Ok((!image.is_empty()).then(|| image.to_string()))
        } else if is_not_found(&output) {
            Ok(None)
        } else {
            Err(ClusterError::CommandFailed(output.failure_message()))
        }
    }

    async fn namespace_status(
        &self,
        namespace: &ResourceName,
    ) -> Result<NamespaceStatus, ClusterError> {
        let output = self
            .kubectl_checked(&[
                "get",
                "statefulsets,deployments",
                "-n",
                namespace.as_str(),
                "-o",
                "json",
            ])
            .await?;

        parse_namespace_status(namespace, &output.stdout)
    }
}

#[derive(Deserialize)]
struct WorkloadList {
    #[serde(default)]
    items: Vec<WorkloadItem>,
}

#[derive(Deserialize)]
struct WorkloadItem {
    kind: String,
    metadata: Metadata,
    #[serde(default)]
    spec: WorkloadSpec,
    #[serde(default)]
    status: WorkloadState,
}

#[derive(Deserialize)]
struct Metadata {
    name: String,
}

#[derive(Deserialize, Default)]
struct WorkloadSpec {
    replicas: Option<u32>,
    #[serde(default)]
    template: PodTemplate,
}

#[derive(Deserialize, Default)]
struct PodTemplate {
    #[serde(default)]
    spec: PodSpec,
}

#[derive(Deserialize, Default)]
struct PodSpec {
    #[serde(default)]
    containers: Vec<Container>,
}

#[derive(Deserialize)]
struct Container {
    #[serde(default)]
    image: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WorkloadState {
    ready_replicas: Option<u32>,
}

/// Parse `kubectl get statefulsets,deployments -o json` output.
pub(crate) fn parse_namespace_status(
    namespace: &ResourceName,
    json: &str,
) -> Result<NamespaceStatus, ClusterError> {
    let list: WorkloadList =
        serde_json::from_str(json).map_err(|e| ClusterError::InvalidOutput(e.to_string()))?;

    let workloads = list
        .items
        .into_iter()
        .filter_map(|item| {
            let kind = match item.kind.as_str() {
                "StatefulSet" => WorkloadKind::StatefulSet,
                "Deployment" => WorkloadKind::Deployment,
                _ => return None,
            };
            Some(WorkloadStatus {
                kind,
                name: item.metadata.name,
                desired: item.spec.replicas.unwrap_or(1),
                ready: item.status.ready_replicas.unwrap_or(0),
                images: item
                    .spec
                    .template
                    .spec
                    .containers
                    .into_iter()
                    .map(|c| c.image)
                    .collect(),
            })
        })
        .collect();

    Ok(NamespaceStatus {
        namespace: namespace.to_string(),
        workloads,
    })
}
