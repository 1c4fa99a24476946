// ABOUTME: Stage transition methods for the deploy pipeline.
// ABOUTME: Each method consumes self and returns the next state on success.

use snafu::ResultExt;

use crate::backend::{ClusterOps, ImageBuilder, KubeconfigFile, ManifestRepo, SecretStore};
use crate::config::Config;
use crate::diagnostics::Diagnostics;

use super::connector;
use super::context::ExecutionContext;
use super::desired_state;
use super::error::{ClusterUnreachableSnafu, ManifestUpdateSnafu, PipelineError};
use super::identity::BuildIdentity;
use super::provisioner;
use super::publisher;
use super::report::RunSummary;
use super::rollback;
use super::run::Pipeline;
use super::state::{Connected, HandedOff, Loaded, Provisioned, Published, Recorded};

// =============================================================================
// Credential loading
// =============================================================================

impl Pipeline<Loaded> {
    /// Resolve credentials for `config`. Nothing external is touched.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::MissingCredential` naming every missing secret.
    pub fn load<S>(config: Config, secrets: &S) -> Result<Self, PipelineError>
    where
        S: SecretStore + ?Sized,
    {
        let context = ExecutionContext::load(&config, secrets)?;
        Ok(Pipeline {
            config,
            context,
            state: Loaded,
        })
    }

    /// Write the cluster credentials to a scoped kubeconfig file.
    ///
    /// The file is removed when the returned handle is dropped or closed.
    pub fn materialize_kubeconfig(&self) -> Result<KubeconfigFile, PipelineError> {
        connector::materialize_kubeconfig(&self.context).context(ClusterUnreachableSnafu)
    }

    // =========================================================================
    // Loaded -> Connected
    // =========================================================================

    /// Verify the cluster answers a read-only probe within the connect timeout.
    pub async fn connect<C>(self, cluster: &C) -> Result<Pipeline<Connected>, PipelineError>
    where
        C: ClusterOps + ?Sized,
    {
        let summary = connector::verify(cluster, self.config.cluster.connect_timeout)
            .await
            .context(ClusterUnreachableSnafu)?;
        Ok(self.advance(|_| Connected { cluster: summary }))
    }
}

// =============================================================================
// Connected -> Provisioned
// =============================================================================

impl Pipeline<Connected> {
    /// Ensure the namespace and every configured stateful dependency exist.
    pub async fn provision<C>(
        self,
        cluster: &C,
        diagnostics: &mut Diagnostics,
    ) -> Result<Pipeline<Provisioned>, PipelineError>
    where
        C: ClusterOps + ?Sized,
    {
        let report = provisioner::provision(
            cluster,
            self.context.namespace(),
            &self.config.components(),
            self.config.readiness_policy,
            diagnostics,
        )
        .await?;

        Ok(self.advance(|_| Provisioned {
            provisioning: report,
        }))
    }
}

// =============================================================================
// Provisioned -> Published
// =============================================================================

impl Pipeline<Provisioned> {
    /// Build the image for `identity` and push both of its tags.
    pub async fn publish<B>(
        self,
        builder: &B,
        identity: BuildIdentity,
    ) -> Result<Pipeline<Published>, PipelineError>
    where
        B: ImageBuilder + ?Sized,
    {
        publisher::publish(builder, &self.config, &self.context, &identity).await?;

        Ok(self.advance(|state| Published {
            provisioning: state.provisioning,
            identity,
        }))
    }
}

// =============================================================================
// Published -> Recorded
// =============================================================================

impl Pipeline<Published> {
    /// Capture the live image of the main workload before changing desired state.
    pub async fn record_rollback<C>(self, cluster: &C) -> Result<Pipeline<Recorded>, PipelineError>
    where
        C: ClusterOps + ?Sized,
    {
        let record = rollback::capture(cluster, &self.context).await?;

        Ok(self.advance(|state| Recorded {
            provisioning: state.provisioning,
            identity: state.identity,
            rollback: record,
        }))
    }
}

// =============================================================================
// Recorded -> HandedOff
// =============================================================================

impl Pipeline<Recorded> {
    /// Pin the new version in the overlay, commit, and push.
    pub async fn update_desired_state<R>(
        self,
        repo: &R,
    ) -> Result<Pipeline<HandedOff>, PipelineError>
    where
        R: ManifestRepo + ?Sized,
    {
        let change = desired_state::update(repo, &self.config, &self.state.identity)
            .await
            .context(ManifestUpdateSnafu)?;

        Ok(self.advance(|state| HandedOff {
            provisioning: state.provisioning,
            identity: state.identity,
            rollback: state.rollback,
            change,
        }))
    }
}

// =============================================================================
// HandedOff -> summary
// =============================================================================

impl Pipeline<HandedOff> {
    /// Close the run and produce its summary.
    pub fn finish(self, diagnostics: &Diagnostics) -> RunSummary {
        let HandedOff {
            provisioning,
            identity,
            rollback,
            change,
        } = self.state;

        RunSummary {
            namespace: self.context.namespace().to_string(),
            image: identity.full_image_ref().to_string(),
            latest_image: identity.latest_image_ref().to_string(),
            version_tag: identity.version_tag().to_string(),
            infrastructure_deployed: provisioning.infrastructure_deployed(),
            components: provisioning.components,
            rollback,
            manifest: change,
            warnings: diagnostics
                .warnings()
                .iter()
                .map(|w| w.message.clone())
                .collect(),
        }
    }
}
