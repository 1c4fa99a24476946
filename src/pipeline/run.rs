// ABOUTME: Generic pipeline struct parameterized by state.
// ABOUTME: State-specific accessors expose only what exists at that point.

use crate::config::Config;
use crate::types::ResourceName;

use super::connector::ClusterSummary;
use super::context::ExecutionContext;
use super::desired_state::ManifestChange;
use super::identity::BuildIdentity;
use super::provisioner::ProvisioningReport;
use super::rollback::RollbackRecord;
use super::state::{Connected, HandedOff, Provisioned, Published, Recorded};

/// A deploy run in progress, parameterized by its current stage.
///
/// Stages consume the pipeline and return it in the next state, so they can
/// only run in order and at most once.
#[derive(Debug)]
pub struct Pipeline<S> {
    pub(crate) config: Config,
    pub(crate) context: ExecutionContext,
    pub(crate) state: S,
}

impl<S> Pipeline<S> {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn namespace(&self) -> &ResourceName {
        self.context.namespace()
    }

    /// Move to the next state, carrying forward what it needs from this one.
    pub(crate) fn advance<T>(self, next: impl FnOnce(S) -> T) -> Pipeline<T> {
        Pipeline {
            config: self.config,
            context: self.context,
            state: next(self.state),
        }
    }
}

impl Pipeline<Connected> {
    pub fn cluster(&self) -> &ClusterSummary {
        &self.state.cluster
    }
}

impl Pipeline<Provisioned> {
    pub fn provisioning(&self) -> &ProvisioningReport {
        &self.state.provisioning
    }

    pub fn infrastructure_deployed(&self) -> bool {
        self.state.provisioning.infrastructure_deployed()
    }
}

impl Pipeline<Published> {
    pub fn identity(&self) -> &BuildIdentity {
        &self.state.identity
    }

    pub fn infrastructure_deployed(&self) -> bool {
        self.state.provisioning.infrastructure_deployed()
    }
}

impl Pipeline<Recorded> {
    pub fn identity(&self) -> &BuildIdentity {
        &self.state.identity
    }

    pub fn rollback(&self) -> &RollbackRecord {
        &self.state.rollback
    }
}

impl Pipeline<HandedOff> {
    pub fn identity(&self) -> &BuildIdentity {
        &self.state.identity
    }

    pub fn rollback(&self) -> &RollbackRecord {
        &self.state.rollback
    }

    pub fn change(&self) -> &ManifestChange {
        &self.state.change
    }
}
