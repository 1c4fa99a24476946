// ABOUTME: Configuration types and parsing for shipline.yml.
// ABOUTME: Handles YAML parsing, validation, discovery, and destination merging.

mod deserialize;
mod infrastructure;
mod init;

pub use infrastructure::{
    ComponentConfig, ComponentRole, InfrastructureComponent, InfrastructureConfig,
};
pub use init::init_config;

use crate::backend::{CommitAuthor, WorkloadKind};
use crate::error::{Error, Result};
use crate::types::{ImageRef, ResourceName};
use deserialize::{deserialize_registry, deserialize_repository};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "shipline.yml";
pub const CONFIG_FILENAME_ALT: &str = "shipline.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".shipline/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub image: ImageConfig,

    pub cluster: ClusterConfig,

    #[serde(default)]
    pub credentials: CredentialRefs,

    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    pub manifest: ManifestConfig,

    #[serde(default)]
    pub readiness_policy: ReadinessPolicy,

    #[serde(default)]
    pub tools: ToolPaths,

    #[serde(default)]
    pub destinations: HashMap<String, Destination>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    /// Registry endpoint, e.g. `registry.example.com` or `localhost:5000`.
    #[serde(deserialize_with = "deserialize_registry")]
    pub registry: String,

    /// Repository path inside the registry, e.g. `team/app`.
    #[serde(deserialize_with = "deserialize_repository")]
    pub repository: String,

    #[serde(default = "default_platform")]
    pub platform: String,

    #[serde(default = "default_context")]
    pub context: PathBuf,

    #[serde(default = "default_dockerfile")]
    pub dockerfile: PathBuf,

    #[serde(default = "default_cache_tag")]
    pub cache_tag: String,

    #[serde(default = "default_build_timeout", with = "humantime_serde")]
    pub build_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    pub namespace: ResourceName,

    /// Live workload whose image is captured for rollback.
    pub workload: ResourceName,

    #[serde(default = "default_workload_kind")]
    pub workload_kind: WorkloadKind,

    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

/// Names of the secrets to resolve from secret storage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CredentialRefs {
    #[serde(default = "default_registry_username")]
    pub registry_username: String,
    #[serde(default = "default_registry_password")]
    pub registry_password: String,
    #[serde(default = "default_kubeconfig")]
    pub kubeconfig: String,
}

impl Default for CredentialRefs {
    fn default() -> Self {
        Self {
            registry_username: default_registry_username(),
            registry_password: default_registry_password(),
            kubeconfig: default_kubeconfig(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestConfig {
    /// Working tree of the manifest repository.
    #[serde(default = "default_repo")]
    pub repo: PathBuf,

    /// Overlay file, relative to `repo`.
    pub overlay: PathBuf,

    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default = "default_remote")]
    pub remote: String,

    /// `images[].name` entry to rewrite; defaults to the repository path.
    #[serde(default)]
    pub image_name: Option<String>,

    #[serde(default)]
    pub author: CommitAuthor,

    /// Commit message marker that keeps CI from re-triggering.
    #[serde(default = "default_skip_marker")]
    pub skip_marker: String,
}

/// What a readiness timeout during provisioning means for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessPolicy {
    /// Log a warning and keep going.
    #[default]
    Continue,
    /// Fail the run.
    Abort,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolPaths {
    #[serde(default = "default_kubectl")]
    pub kubectl: PathBuf,
    #[serde(default = "default_docker")]
    pub docker: PathBuf,
    #[serde(default = "default_git")]
    pub git: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            kubectl: default_kubectl(),
            docker: default_docker(),
            git: default_git(),
        }
    }
}

/// Per-environment overrides.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Destination {
    #[serde(default)]
    pub namespace: Option<ResourceName>,
    #[serde(default)]
    pub workload: Option<ResourceName>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub overlay: Option<PathBuf>,
    #[serde(default)]
    pub credentials: Option<CredentialRefs>,
    #[serde(default)]
    pub readiness_policy: Option<ReadinessPolicy>,
}

fn default_platform() -> String {
    "linux/amd64".to_string()
}

fn default_context() -> PathBuf {
    PathBuf::from(".")
}

fn default_dockerfile() -> PathBuf {
    PathBuf::from("Dockerfile")
}

fn default_cache_tag() -> String {
    "buildcache".to_string()
}

fn default_build_timeout() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_workload_kind() -> WorkloadKind {
    WorkloadKind::Deployment
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_registry_username() -> String {
    "REGISTRY_USERNAME".to_string()
}

fn default_registry_password() -> String {
    "REGISTRY_PASSWORD".to_string()
}

fn default_kubeconfig() -> String {
    "KUBE_CONFIG".to_string()
}

fn default_repo() -> PathBuf {
    PathBuf::from(".")
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_skip_marker() -> String {
    "[skip ci]".to_string()
}

fn default_kubectl() -> PathBuf {
    PathBuf::from("kubectl")
}

fn default_docker() -> PathBuf {
    PathBuf::from("docker")
}

fn default_git() -> PathBuf {
    PathBuf::from("git")
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading configuration");
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        self.base_image()?
            .with_tag(&self.image.cache_tag)
            .map_err(|e| Error::InvalidConfig(format!("image.cache_tag: {e}")))?;

        if self.manifest.branch.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "manifest.branch cannot be empty".to_string(),
            ));
        }

        if self.manifest.skip_marker.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "manifest.skip_marker cannot be empty".to_string(),
            ));
        }

        if self.manifest.overlay.is_absolute() {
            return Err(Error::InvalidConfig(
                "manifest.overlay must be relative to manifest.repo".to_string(),
            ));
        }

        Ok(())
    }

    pub fn for_destination(&self, name: &str) -> Result<Config> {
        let dest = self
            .destinations
            .get(name)
            .ok_or_else(|| Error::UnknownDestination(name.to_string()))?;

        let mut merged = self.clone();

        if let Some(ref namespace) = dest.namespace {
            merged.cluster.namespace = namespace.clone();
        }

        if let Some(ref workload) = dest.workload {
            merged.cluster.workload = workload.clone();
        }

        if let Some(ref branch) = dest.branch {
            merged.manifest.branch = branch.clone();
        }

        if let Some(ref overlay) = dest.overlay {
            merged.manifest.overlay = overlay.clone();
        }

        if let Some(ref credentials) = dest.credentials {
            merged.credentials = credentials.clone();
        }

        if let Some(policy) = dest.readiness_policy {
            merged.readiness_policy = policy;
        }

        merged.validate()?;
        Ok(merged)
    }

    /// `<registry>/<repository>:latest`.
    pub fn base_image(&self) -> Result<ImageRef> {
        ImageRef::from_parts(&self.image.registry, &self.image.repository, "latest")
            .map_err(|e| Error::InvalidConfig(format!("image: {e}")))
    }

    /// The `images[].name` entry to rewrite in the overlay.
    pub fn overlay_image_name(&self) -> &str {
        self.manifest
            .image_name
            .as_deref()
            .unwrap_or(&self.image.repository)
    }

    /// Absolute-or-cwd-relative path of the overlay file.
    pub fn overlay_path(&self) -> PathBuf {
        self.manifest.repo.join(&self.manifest.overlay)
    }

    pub fn components(&self) -> Vec<InfrastructureComponent> {
        self.infrastructure.components()
    }
}
