// ABOUTME: Outcome reporter for successful and failed runs.
// ABOUTME: Failure reports carry namespace diagnostics when the cluster was reachable.

use serde::Serialize;

use crate::backend::{ClusterOps, NamespaceStatus};
use crate::types::ResourceName;

use super::desired_state::ManifestChange;
use super::error::{PipelineError, PipelineErrorKind};
use super::provisioner::ComponentOutcome;
use super::rollback::RollbackRecord;

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub namespace: String,
    pub image: String,
    pub latest_image: String,
    pub version_tag: String,
    pub infrastructure_deployed: bool,
    pub components: Vec<ComponentOutcome>,
    pub rollback: RollbackRecord,
    pub manifest: ManifestChange,
    pub warnings: Vec<String>,
}

impl RunSummary {
    /// Single line for quiet mode: `<image> infrastructure=<deployed|unchanged>`.
    pub fn quiet_line(&self) -> String {
        format!("{} infrastructure={}", self.image, self.infrastructure_label())
    }

    fn infrastructure_label(&self) -> &'static str {
        if self.infrastructure_deployed {
            "deployed"
        } else {
            "unchanged"
        }
    }

    /// Human-readable summary lines.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Deployed {} to {}", self.image, self.namespace),
            format!("  version tag:    {}", self.version_tag),
            format!("  latest:         {}", self.latest_image),
            format!("  infrastructure: {}", self.infrastructure_label()),
        ];

        lines.push(format!(
            "  previous image: {}",
            self.rollback
                .previous_image
                .as_deref()
                .unwrap_or("none (first deploy)")
        ));

        lines.push(match self.manifest {
            ManifestChange::Committed { ref commit, .. } => format!(
                "  manifest:       committed {commit} (the GitOps controller applies it asynchronously)"
            ),
            ManifestChange::Unchanged => "  manifest:       unchanged".to_string(),
        });

        for warning in &self.warnings {
            lines.push(format!("  warning: {warning}"));
        }

        lines
    }
}

/// Everything known about a failed run.
#[derive(Debug, Serialize)]
pub struct FailureReport {
    pub kind: PipelineErrorKind,
    pub error: String,
    /// The image may already be in the registry.
    pub image_published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_status: Option<NamespaceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_error: Option<String>,
}

impl FailureReport {
    /// Build a report for `error`, querying namespace state when `cluster` is usable.
    pub async fn collect<C>(
        error: &PipelineError,
        cluster: Option<&C>,
        namespace: &ResourceName,
    ) -> Self
    where
        C: ClusterOps + ?Sized,
    {
        let mut report = Self {
            kind: error.kind(),
            error: error.to_string(),
            image_published: error.image_published(),
            namespace_status: None,
            status_error: None,
        };

        let cluster = match cluster {
            Some(cluster) if error.cluster_reachable() => cluster,
            _ => return report,
        };

        match cluster.namespace_status(namespace).await {
            Ok(status) => report.namespace_status = Some(status),
            Err(e) => {
                tracing::warn!(error = %e, "failed to collect namespace status");
                report.status_error = Some(e.to_string());
            }
        }

        report
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Deploy failed: {}", self.error)];

        if self.image_published {
            lines.push("  the image was published before the failure".to_string());
        }

        if let Some(ref status) = self.namespace_status {
            lines.push(format!("  workloads in {}:", status.namespace));
            if status.workloads.is_empty() {
                lines.push("    (none)".to_string());
            }
            for workload in &status.workloads {
                lines.push(format!(
                    "    {}/{} {}/{} ready {}",
                    workload.kind,
                    workload.name,
                    workload.ready,
                    workload.desired,
                    workload.images.join(",")
                ));
            }
        }

        if let Some(ref err) = self.status_error {
            lines.push(format!("  namespace status unavailable: {err}"));
        }

        lines
    }
}
