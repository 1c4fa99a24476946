// ABOUTME: Rollback recorder: captures the live image before desired state changes.
// ABOUTME: An absent workload is a first deploy; other query failures are fatal.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use snafu::ResultExt;

use crate::backend::{ClusterOps, WorkloadKind};

use super::context::ExecutionContext;
use super::error::{PipelineError, RollbackCaptureSnafu};

/// The live image of the main workload at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackRecord {
    /// `None` on first deploy.
    pub previous_image: Option<String>,
    pub namespace: String,
    pub workload: String,
    pub kind: WorkloadKind,
    pub captured_at: DateTime<Utc>,
}

impl RollbackRecord {
    pub fn is_first_deploy(&self) -> bool {
        self.previous_image.is_none()
    }

    /// Write the record as pretty JSON for a later manual rollback.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json + "\n")
    }
}

pub async fn capture<C>(
    cluster: &C,
    context: &ExecutionContext,
) -> Result<RollbackRecord, PipelineError>
where
    C: ClusterOps + ?Sized,
{
    let previous_image = cluster
        .live_image(context.namespace(), context.workload_kind(), context.workload())
        .await
        .context(RollbackCaptureSnafu)?;

    match previous_image {
        Some(ref image) => tracing::info!(previous_image = %image, "rollback point recorded"),
        None => tracing::info!(
            workload = %context.workload(),
            "workload not found, first deploy"
        ),
    }

    Ok(RollbackRecord {
        previous_image,
        namespace: context.namespace().to_string(),
        workload: context.workload().to_string(),
        kind: context.workload_kind(),
        captured_at: Utc::now(),
    })
}
