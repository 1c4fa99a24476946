// ABOUTME: Execution context resolved from configuration and secret storage.
// ABOUTME: Fails up front, naming every credential that is missing.

use crate::backend::{RegistryCredentials, SecretStore, WorkloadKind};
use crate::config::Config;
use crate::types::{ResourceName, Secret};

use super::error::PipelineError;

/// Target and credentials for one run. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    registry: String,
    repository: String,
    namespace: ResourceName,
    workload: ResourceName,
    workload_kind: WorkloadKind,
    branch: String,
    registry_credentials: RegistryCredentials,
    cluster_credentials: Secret,
}

impl ExecutionContext {
    /// Resolve every credential reference in `config` against `secrets`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::MissingCredential` listing all unresolved names.
    pub fn load<S>(config: &Config, secrets: &S) -> Result<Self, PipelineError>
    where
        S: SecretStore + ?Sized,
    {
        let refs = &config.credentials;
        let mut missing = Vec::new();
        let mut resolve = |name: &str| {
            let value = secrets.resolve(name);
            if value.is_none() {
                missing.push(name.to_string());
            }
            value
        };

        let username = resolve(&refs.registry_username);
        let password = resolve(&refs.registry_password);
        let kubeconfig = resolve(&refs.kubeconfig);

        let (Some(username), Some(password), Some(cluster_credentials)) =
            (username, password, kubeconfig)
        else {
            return Err(PipelineError::MissingCredential { names: missing });
        };

        tracing::debug!(
            namespace = %config.cluster.namespace,
            branch = %config.manifest.branch,
            "credentials resolved"
        );

        Ok(Self {
            registry: config.image.registry.clone(),
            repository: config.image.repository.clone(),
            namespace: config.cluster.namespace.clone(),
            workload: config.cluster.workload.clone(),
            workload_kind: config.cluster.workload_kind,
            branch: config.manifest.branch.clone(),
            registry_credentials: RegistryCredentials {
                username: username.expose().to_string(),
                password,
            },
            cluster_credentials,
        })
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn namespace(&self) -> &ResourceName {
        &self.namespace
    }

    /// Live workload whose image is captured for rollback.
    pub fn workload(&self) -> &ResourceName {
        &self.workload
    }

    pub fn workload_kind(&self) -> WorkloadKind {
        self.workload_kind
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn registry_credentials(&self) -> &RegistryCredentials {
        &self.registry_credentials
    }

    /// Base64 kubeconfig blob.
    pub fn cluster_credentials(&self) -> &Secret {
        &self.cluster_credentials
    }
}
