// ABOUTME: Stateful dependency configuration for the provisioner.
// ABOUTME: Database, cache, and reverse proxy, each with manifest and readiness probe.

use crate::backend::{ReadinessProbe, WorkloadKind};
use crate::types::ResourceName;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// The fixed set of stateful dependencies, in provisioning order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentRole {
    Database,
    Cache,
    ReverseProxy,
}

impl ComponentRole {
    pub const ALL: [ComponentRole; 3] = [
        ComponentRole::Database,
        ComponentRole::Cache,
        ComponentRole::ReverseProxy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentRole::Database => "database",
            ComponentRole::Cache => "cache",
            ComponentRole::ReverseProxy => "reverse-proxy",
        }
    }
}

impl fmt::Display for ComponentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InfrastructureConfig {
    #[serde(default)]
    pub database: Option<ComponentConfig>,
    #[serde(default)]
    pub cache: Option<ComponentConfig>,
    #[serde(default, rename = "reverse-proxy", alias = "reverse_proxy")]
    pub reverse_proxy: Option<ComponentConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComponentConfig {
    /// Workload name; defaults to the role name.
    #[serde(default)]
    pub name: Option<ResourceName>,

    #[serde(default)]
    pub kind: WorkloadKind,

    pub manifest: PathBuf,

    pub readiness: ReadinessProbe,

    #[serde(default = "default_readiness_timeout", with = "humantime_serde")]
    pub readiness_timeout: Duration,
}

fn default_readiness_timeout() -> Duration {
    Duration::from_secs(300)
}

/// A configured stateful dependency, resolved against its role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfrastructureComponent {
    pub role: ComponentRole,
    pub name: ResourceName,
    pub kind: WorkloadKind,
    pub manifest: PathBuf,
    pub readiness: ReadinessProbe,
    pub readiness_timeout: Duration,
}

impl InfrastructureConfig {
    fn get(&self, role: ComponentRole) -> Option<&ComponentConfig> {
        match role {
            ComponentRole::Database => self.database.as_ref(),
            ComponentRole::Cache => self.cache.as_ref(),
            ComponentRole::ReverseProxy => self.reverse_proxy.as_ref(),
        }
    }

    /// Configured components in role order.
    pub fn components(&self) -> Vec<InfrastructureComponent> {
        ComponentRole::ALL
            .iter()
            .filter_map(|&role| self.get(role).map(|c| c.resolve(role)))
            .collect()
    }
}

impl ComponentConfig {
    fn resolve(&self, role: ComponentRole) -> InfrastructureComponent {
        let name = match self.name {
            Some(ref name) => name.clone(),
            None => ResourceName::new(role.as_str())
                .expect("role names are valid resource names"),
        };

        InfrastructureComponent {
            role,
            name,
            kind: self.kind,
            manifest: self.manifest.clone(),
            readiness: self.readiness.clone(),
            readiness_timeout: self.readiness_timeout,
        }
    }
}
