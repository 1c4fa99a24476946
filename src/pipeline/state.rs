// ABOUTME: Pipeline state types for the type state pattern.
// ABOUTME: Each state carries what later stages and the final report need.

use super::connector::ClusterSummary;
use super::desired_state::ManifestChange;
use super::identity::BuildIdentity;
use super::provisioner::ProvisioningReport;
use super::rollback::RollbackRecord;

/// Credentials resolved, nothing touched yet.
/// Available actions: `connect()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Loaded;

/// Cluster answered the connectivity probe.
/// Available actions: `provision()`
#[derive(Debug, Clone)]
pub struct Connected {
    pub(crate) cluster: ClusterSummary,
}

/// Namespace and stateful dependencies are in place.
/// Available actions: `publish()`
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub(crate) provisioning: ProvisioningReport,
}

/// Image is in the registry under both tags.
/// Available actions: `record_rollback()`
#[derive(Debug, Clone)]
pub struct Published {
    pub(crate) provisioning: ProvisioningReport,
    pub(crate) identity: BuildIdentity,
}

/// Previous live image captured.
/// Available actions: `update_desired_state()`
#[derive(Debug, Clone)]
pub struct Recorded {
    pub(crate) provisioning: ProvisioningReport,
    pub(crate) identity: BuildIdentity,
    pub(crate) rollback: RollbackRecord,
}

/// Desired state handed off to the reconciler.
/// Available actions: `finish()`
#[derive(Debug, Clone)]
pub struct HandedOff {
    pub(crate) provisioning: ProvisioningReport,
    pub(crate) identity: BuildIdentity,
    pub(crate) rollback: RollbackRecord,
    pub(crate) change: ManifestChange,
}
