// ABOUTME: Infrastructure provisioner for the namespace's stateful dependencies.
// ABOUTME: Applies only absent components and bounds each readiness wait.

use serde::Serialize;
use snafu::ResultExt;

use crate::backend::{ClusterOps, Readiness};
use crate::config::{InfrastructureComponent, ReadinessPolicy};
use crate::diagnostics::{Diagnostics, Warning};
use crate::types::ResourceName;

use super::error::{PipelineError, ProvisioningSnafu};

/// What the provisioner did for one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProvisionAction {
    /// Workload already existed; nothing was applied.
    AlreadyPresent,
    /// Manifest was applied, then readiness was awaited.
    Created { readiness: Readiness },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentOutcome {
    pub role: String,
    pub name: String,
    #[serde(flatten)]
    pub action: ProvisionAction,
}

/// Outcome of one provisioning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisioningReport {
    pub components: Vec<ComponentOutcome>,
}

impl ProvisioningReport {
    /// True iff at least one component was created in this run.
    pub fn infrastructure_deployed(&self) -> bool {
        self.components
            .iter()
            .any(|c| matches!(c.action, ProvisionAction::Created { .. }))
    }

    /// Components created in this run that never became ready.
    pub fn degraded(&self) -> impl Iterator<Item = &ComponentOutcome> {
        self.components.iter().filter(|c| {
            matches!(
                c.action,
                ProvisionAction::Created {
                    readiness: Readiness::Degraded { .. }
                }
            )
        })
    }
}

/// Ensure `namespace` and every component in it exist.
///
/// Components are handled in order. A component whose workload exists is
/// left untouched. A readiness timeout is a warning under
/// `ReadinessPolicy::Continue` and a `ProvisioningTimeout` under `Abort`.
pub async fn provision<C>(
    cluster: &C,
    namespace: &ResourceName,
    components: &[InfrastructureComponent],
    policy: ReadinessPolicy,
    diagnostics: &mut Diagnostics,
) -> Result<ProvisioningReport, PipelineError>
where
    C: ClusterOps + ?Sized,
{
    cluster
        .ensure_namespace(namespace)
        .await
        .context(ProvisioningSnafu {
            component: format!("namespace {namespace}"),
        })?;

    let mut report = ProvisioningReport::default();

    for component in components {
        let label = format!("{} ({})", component.role, component.name);

        let present = cluster
            .workload_exists(namespace, component.kind, &component.name)
            .await
            .context(ProvisioningSnafu {
                component: label.clone(),
            })?;

        if present {
            tracing::info!(component = %label, "already present, skipping");
            report.components.push(outcome(component, ProvisionAction::AlreadyPresent));
            continue;
        }

        tracing::info!(
            component = %label,
            manifest = %component.manifest.display(),
            "applying manifest"
        );
        cluster
            .apply_manifest(namespace, &component.manifest)
            .await
            .context(ProvisioningSnafu {
                component: label.clone(),
            })?;

        let readiness = cluster
            .wait_ready(namespace, &component.readiness, component.readiness_timeout)
            .await
            .context(ProvisioningSnafu {
                component: label.clone(),
            })?;

        if let Readiness::Degraded { ref reason } = readiness {
            match policy {
                ReadinessPolicy::Abort => {
                    return Err(PipelineError::ProvisioningTimeout {
                        component: label,
                        timeout: component.readiness_timeout,
                        reason: reason.clone(),
                    });
                }
                ReadinessPolicy::Continue => diagnostics.warn(Warning::readiness_degraded(
                    format!("{label} not ready: {reason}"),
                )),
            }
        } else {
            tracing::info!(component = %label, "ready");
        }

        report
            .components
            .push(outcome(component, ProvisionAction::Created { readiness }));
    }

    Ok(report)
}

fn outcome(component: &InfrastructureComponent, action: ProvisionAction) -> ComponentOutcome {
    ComponentOutcome {
        role: component.role.to_string(),
        name: component.name.to_string(),
        action,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created(readiness: Readiness) -> ComponentOutcome {
        ComponentOutcome {
            role: "database".to_string(),
            name: "database".to_string(),
            action: ProvisionAction::Created { readiness },
        }
    }

    #[test]
    fn empty_report_deploys_nothing() {
        assert!(!ProvisioningReport::default().infrastructure_deployed());
    }

    #[test]
    fn already_present_components_do_not_count() {
        let report = ProvisioningReport {
            components: vec![ComponentOutcome {
                role: "cache".to_string(),
                name: "cache".to_string(),
                action: ProvisionAction::AlreadyPresent,
            }],
        };
        assert!(!report.infrastructure_deployed());
    }

    #[test]
    fn degraded_components_still_count_as_deployed() {
        let report = ProvisioningReport {
            components: vec![created(Readiness::Degraded {
                reason: "timed out".to_string(),
            })],
        };
        assert!(report.infrastructure_deployed());
        assert_eq!(report.degraded().count(), 1);
    }

    #[test]
    fn outcome_serializes_flat() {
        let json = serde_json::to_value(created(Readiness::Ready)).unwrap();
        assert_eq!(json["action"], "created");
        assert_eq!(json["readiness"]["status"], "ready");
        assert_eq!(json["role"], "database");
    }
}
