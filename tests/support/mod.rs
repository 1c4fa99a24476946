// ABOUTME: Test support utilities.
// ABOUTME: In-memory fakes for the cluster, image builder, manifest repo and secrets.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use parking_lot::Mutex;
use shipline::backend::{
    BuildError, BuildRequest, ClusterError, ClusterOps, CommitAuthor, ImageBuilder, ManifestRepo,
    NamespaceStatus, Readiness, ReadinessProbe, RegistryCredentials, RepoError, SecretStore,
    WorkloadKind, WorkloadStatus,
};
use shipline::config::Config;
use shipline::types::{ResourceName, Secret};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter =
            EnvFilter::from_default_env().add_directive("shipline=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const KUBECONFIG_YAML: &str = "apiVersion: v1\nkind: Config\nclusters: []\n";

/// Configuration with all three components under `k8s/<role>.yaml`.
pub fn test_config() -> Config {
    Config::from_yaml(
        r#"
image:
  registry: registry.example.com
  repository: team/app
cluster:
  namespace: prod
  workload: app
  connect_timeout: 200ms
infrastructure:
  database:
    manifest: k8s/database.yaml
    readiness: { selector: app=postgres }
    readiness_timeout: 1s
  cache:
    manifest: k8s/cache.yaml
    readiness: { selector: app=redis }
    readiness_timeout: 1s
  reverse-proxy:
    manifest: k8s/reverse-proxy.yaml
    readiness: { selector: app=nginx }
    readiness_timeout: 1s
manifest:
  overlay: overlays/prod/kustomization.yaml
  branch: main
"#,
    )
    .unwrap()
}

// =============================================================================
// Secrets
// =============================================================================

#[derive(Debug, Default)]
pub struct MapSecrets(HashMap<String, String>);

impl MapSecrets {
    /// Every credential the default config references.
    pub fn complete() -> Self {
        Self::default()
            .with("REGISTRY_USERNAME", "ci-bot")
            .with("REGISTRY_PASSWORD", "hunter2")
            .with("KUBE_CONFIG", &STANDARD.encode(KUBECONFIG_YAML))
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.to_string(), value.to_string());
        self
    }

    pub fn without(mut self, name: &str) -> Self {
        self.0.remove(name);
        self
    }
}

impl SecretStore for MapSecrets {
    fn resolve(&self, name: &str) -> Option<Secret> {
        self.0
            .get(name)
            .filter(|v| !v.trim().is_empty())
            .map(|v| Secret::new(v.clone()))
    }
}

// =============================================================================
// Cluster
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterCall {
    ClusterInfo,
    NodeNames,
    CreateNamespace(String),
    WorkloadExists(String),
    Apply(PathBuf),
    WaitReady(String),
    LiveImage(String),
    NamespaceStatus,
}

#[derive(Debug, Default)]
struct ClusterState {
    namespaces: HashSet<String>,
    /// Workload name to its first container image.
    workloads: HashMap<String, String>,
    calls: Vec<ClusterCall>,
}

/// A cluster that applies manifests by creating a workload named after the file stem.
#[derive(Debug)]
pub struct FakeCluster {
    state: Mutex<ClusterState>,
    nodes: Vec<String>,
    reachable: bool,
    probe_delay: Option<Duration>,
    degraded: HashSet<String>,
    live_image_error: Option<String>,
}

impl Default for FakeCluster {
    fn default() -> Self {
        Self {
            state: Mutex::new(ClusterState::default()),
            nodes: vec!["node-a".to_string()],
            reachable: true,
            probe_delay: None,
            degraded: HashSet::new(),
            live_image_error: None,
        }
    }
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workload(self, name: &str, image: &str) -> Self {
        self.state
            .lock()
            .workloads
            .insert(name.to_string(), image.to_string());
        self
    }

    pub fn with_namespace(self, namespace: &str) -> Self {
        self.state.lock().namespaces.insert(namespace.to_string());
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    pub fn without_nodes(mut self) -> Self {
        self.nodes.clear();
        self
    }

    pub fn slow_probe(mut self, delay: Duration) -> Self {
        self.probe_delay = Some(delay);
        self
    }

    /// Pods matching `selector` never become ready.
    pub fn never_ready(mut self, selector: &str) -> Self {
        self.degraded.insert(selector.to_string());
        self
    }

    pub fn failing_live_image(mut self, message: &str) -> Self {
        self.live_image_error = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ClusterCall> {
        self.state.lock().calls.clone()
    }

    pub fn applied(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ClusterCall::Apply(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn waited(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ClusterCall::WaitReady(selector) => Some(selector),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn record(&self, call: ClusterCall) {
        self.state.lock().calls.push(call);
    }

    fn check_reachable(&self) -> Result<(), ClusterError> {
        if self.reachable {
            Ok(())
        } else {
            Err(ClusterError::CommandFailed(
                "Unable to connect to the server: dial tcp: i/o timeout".to_string(),
            ))
        }
    }
}

#[async_trait]
impl ClusterOps for FakeCluster {
    async fn cluster_info(&self) -> Result<String, ClusterError> {
        self.record(ClusterCall::ClusterInfo);
        if let Some(delay) = self.probe_delay {
            tokio::time::sleep(delay).await;
        }
        self.check_reachable()?;
        Ok("Kubernetes control plane is running at https://10.0.0.1:6443".to_string())
    }

    async fn node_names(&self) -> Result<Vec<String>, ClusterError> {
        self.record(ClusterCall::NodeNames);
        self.check_reachable()?;
        Ok(self.nodes.clone())
    }

    async fn ensure_namespace(&self, namespace: &ResourceName) -> Result<(), ClusterError> {
        let mut state = self.state.lock();
        if state.namespaces.insert(namespace.to_string()) {
            state
                .calls
                .push(ClusterCall::CreateNamespace(namespace.to_string()));
        }
        Ok(())
    }

    async fn workload_exists(
        &self,
        _namespace: &ResourceName,
        _kind: WorkloadKind,
        name: &ResourceName,
    ) -> Result<bool, ClusterError> {
        let mut state = self.state.lock();
        state
            .calls
            .push(ClusterCall::WorkloadExists(name.to_string()));
        Ok(state.workloads.contains_key(name.as_str()))
    }

    async fn apply_manifest(
        &self,
        _namespace: &ResourceName,
        manifest: &Path,
    ) -> Result<(), ClusterError> {
        let name = manifest
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut state = self.state.lock();
        state.calls.push(ClusterCall::Apply(manifest.to_path_buf()));
        state.workloads.insert(name.clone(), format!("{name}:stable"));
        Ok(())
    }

    async fn wait_ready(
        &self,
        _namespace: &ResourceName,
        probe: &ReadinessProbe,
        timeout: Duration,
    ) -> Result<Readiness, ClusterError> {
        self.record(ClusterCall::WaitReady(probe.selector.clone()));
        if self.degraded.contains(&probe.selector) {
            Ok(Readiness::Degraded {
                reason: format!("pods matching {} not ready within {timeout:?}", probe.selector),
            })
        } else {
            Ok(Readiness::Ready)
        }
    }

    async fn live_image(
        &self,
        _namespace: &ResourceName,
        _kind: WorkloadKind,
        name: &ResourceName,
    ) -> Result<Option<String>, ClusterError> {
        self.record(ClusterCall::LiveImage(name.to_string()));
        if let Some(ref message) = self.live_image_error {
            return Err(ClusterError::CommandFailed(message.clone()));
        }
        Ok(self.state.lock().workloads.get(name.as_str()).cloned())
    }

    async fn namespace_status(
        &self,
        namespace: &ResourceName,
    ) -> Result<NamespaceStatus, ClusterError> {
        self.record(ClusterCall::NamespaceStatus);
        self.check_reachable()?;

        let state = self.state.lock();
        let mut workloads: Vec<_> = state
            .workloads
            .iter()
            .map(|(name, image)| WorkloadStatus {
                kind: WorkloadKind::StatefulSet,
                name: name.clone(),
                desired: 1,
                ready: 1,
                images: vec![image.clone()],
            })
            .collect();
        workloads.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(NamespaceStatus {
            namespace: namespace.to_string(),
            workloads,
        })
    }
}

// =============================================================================
// Image builder
// =============================================================================

#[derive(Debug, Clone)]
pub enum BuilderCall {
    Login { registry: String, username: String },
    BuildAndPush(BuildRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildFailure {
    Login,
    Compile,
    Push,
}

#[derive(Debug, Default)]
pub struct FakeBuilder {
    calls: Mutex<Vec<BuilderCall>>,
    failure: Option<BuildFailure>,
}

impl FakeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failure: BuildFailure) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: Some(failure),
        }
    }

    pub fn calls(&self) -> Vec<BuilderCall> {
        self.calls.lock().clone()
    }

    /// Tags of every build request, in order.
    pub fn built_tags(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                BuilderCall::BuildAndPush(request) => {
                    Some(request.tags.iter().map(ToString::to_string).collect())
                }
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ImageBuilder for FakeBuilder {
    async fn login(
        &self,
        registry: &str,
        credentials: &RegistryCredentials,
    ) -> Result<(), BuildError> {
        self.calls.lock().push(BuilderCall::Login {
            registry: registry.to_string(),
            username: credentials.username.clone(),
        });
        match self.failure {
            Some(BuildFailure::Login) => Err(BuildError::LoginFailed("unauthorized".to_string())),
            _ => Ok(()),
        }
    }

    async fn build_and_push(&self, request: &BuildRequest) -> Result<(), BuildError> {
        self.calls
            .lock()
            .push(BuilderCall::BuildAndPush(request.clone()));
        match self.failure {
            Some(BuildFailure::Compile) => Err(BuildError::BuildFailed(
                "failed to solve: process did not complete successfully".to_string(),
            )),
            Some(BuildFailure::Push) => {
                Err(BuildError::PushFailed("failed to push: 403".to_string()))
            }
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Manifest repository
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoCall {
    Stage(PathBuf),
    Commit { message: String, author: String },
    Push { remote: String, branch: String },
}

/// A repository rooted at a real directory whose git side is recorded, not run.
#[derive(Debug)]
pub struct FakeRepo {
    root: PathBuf,
    calls: Mutex<Vec<RepoCall>>,
    staged: Mutex<bool>,
    reject_push: bool,
}

impl FakeRepo {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            calls: Mutex::new(Vec::new()),
            staged: Mutex::new(false),
            reject_push: false,
        }
    }

    pub fn rejecting_push(mut self) -> Self {
        self.reject_push = true;
        self
    }

    pub fn calls(&self) -> Vec<RepoCall> {
        self.calls.lock().clone()
    }

    pub fn commits(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RepoCall::Commit { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ManifestRepo for FakeRepo {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn stage(&self, path: &Path) -> Result<(), RepoError> {
        self.calls.lock().push(RepoCall::Stage(path.to_path_buf()));
        *self.staged.lock() = true;
        Ok(())
    }

    async fn has_staged_changes(&self) -> Result<bool, RepoError> {
        Ok(*self.staged.lock())
    }

    async fn commit(&self, message: &str, author: &CommitAuthor) -> Result<String, RepoError> {
        self.calls.lock().push(RepoCall::Commit {
            message: message.to_string(),
            author: author.name.clone(),
        });
        *self.staged.lock() = false;
        Ok("0123456789abcdef0123456789abcdef01234567".to_string())
    }

    async fn push(&self, remote: &str, branch: &str) -> Result<(), RepoError> {
        self.calls.lock().push(RepoCall::Push {
            remote: remote.to_string(),
            branch: branch.to_string(),
        });
        if self.reject_push {
            Err(RepoError::PushRejected(
                "! [rejected] HEAD -> main (fetch first)".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Write a kustomize overlay under `root` at the test config's overlay path.
pub fn write_overlay(root: &Path, content: &str) -> PathBuf {
    let path = root.join("overlays/prod/kustomization.yaml");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    path
}

pub const OVERLAY: &str = r#"apiVersion: kustomize.config.k8s.io/v1beta1
kind: Kustomization
namespace: prod
resources:
  - ../../base
images:
  - name: team/app
    newName: registry.example.com/team/app
    newTag: old1234-7
  - name: nginx
    newTag: "1.27"
"#;
