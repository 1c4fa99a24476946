// ABOUTME: Integration tests for the kubectl-backed cluster adapter.
// ABOUTME: Runs KubectlCluster against a scripted fake kubectl binary.

use shipline::backend::{ClusterOps, KubectlCluster, Readiness, ReadinessProbe, WorkloadKind};
use shipline::types::ResourceName;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Write an executable fake kubectl that logs its arguments and runs `body`.
fn fake_kubectl(dir: &TempDir, body: &str) -> PathBuf {
    let log = dir.path().join("calls.log");
    let path = dir.path().join("kubectl");
    let script = format!(
        "#!/bin/sh\necho \"$*\" >> '{}'\n{}\n",
        log.display(),
        body
    );
    fs::write(&path, script).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn calls(dir: &TempDir) -> Vec<String> {
    fs::read_to_string(dir.path().join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(String::from)
        .collect()
}

fn cluster(program: &Path) -> KubectlCluster {
    KubectlCluster::new(program, "/tmp/scoped/kubeconfig").request_timeout(Duration::from_secs(5))
}

fn ns() -> ResourceName {
    ResourceName::new("prod").unwrap()
}

#[tokio::test]
async fn node_names_strip_prefix() {
    let dir = TempDir::new().unwrap();
    let kubectl = fake_kubectl(&dir, "printf 'node/a\\nnode/b\\n'");

    let nodes = cluster(&kubectl).node_names().await.unwrap();

    assert_eq!(nodes, ["a", "b"]);
    assert_eq!(
        calls(&dir),
        ["--kubeconfig /tmp/scoped/kubeconfig get nodes -o name"]
    );
}

#[tokio::test]
async fn cluster_info_failure_is_an_error() {
    let dir = TempDir::new().unwrap();
    let kubectl = fake_kubectl(
        &dir,
        "echo 'Unable to connect to the server: dial tcp 10.0.0.1:6443: i/o timeout' >&2\nexit 1",
    );

    let err = cluster(&kubectl).cluster_info().await.unwrap_err();
    assert!(err.to_string().contains("Unable to connect"));
}

#[tokio::test]
async fn missing_namespace_is_created() {
    let dir = TempDir::new().unwrap();
    let kubectl = fake_kubectl(
        &dir,
        r#"case "$*" in
  *"get namespace"*) echo 'Error from server (NotFound): namespaces "prod" not found' >&2; exit 1 ;;
  *"create namespace"*) echo 'namespace/prod created' ;;
esac"#,
    );

    cluster(&kubectl).ensure_namespace(&ns()).await.unwrap();

    let calls = calls(&dir);
    assert_eq!(calls.len(), 2);
    assert!(calls[1].ends_with("create namespace prod"));
}

#[tokio::test]
async fn existing_namespace_is_left_alone() {
    let dir = TempDir::new().unwrap();
    let kubectl = fake_kubectl(&dir, "echo namespace/prod");

    cluster(&kubectl).ensure_namespace(&ns()).await.unwrap();
    assert_eq!(calls(&dir).len(), 1);
}

#[tokio::test]
async fn workload_existence() {
    let dir = TempDir::new().unwrap();
    let kubectl = fake_kubectl(
        &dir,
        r#"case "$*" in
  *"statefulset database"*) echo statefulset.apps/database ;;
  *) echo 'Error from server (NotFound): statefulsets.apps "cache" not found' >&2; exit 1 ;;
esac"#,
    );
    let cluster = cluster(&kubectl);

    let database = ResourceName::new("database").unwrap();
    let cache = ResourceName::new("cache").unwrap();
    assert!(
        cluster
            .workload_exists(&ns(), WorkloadKind::StatefulSet, &database)
            .await
            .unwrap()
    );
    assert!(
        !cluster
            .workload_exists(&ns(), WorkloadKind::StatefulSet, &cache)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn forbidden_query_is_not_absence() {
    let dir = TempDir::new().unwrap();
    let kubectl = fake_kubectl(
        &dir,
        "echo 'Error from server (Forbidden): deployments.apps \"app\" is forbidden' >&2\nexit 1",
    );
    let app = ResourceName::new("app").unwrap();

    let err = cluster(&kubectl)
        .live_image(&ns(), WorkloadKind::Deployment, &app)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Forbidden"));
}

#[tokio::test]
async fn live_image_reads_first_container() {
    let dir = TempDir::new().unwrap();
    let kubectl = fake_kubectl(&dir, "printf 'registry.example.com/team/app:old1234-7'");
    let app = ResourceName::new("app").unwrap();

    let image = cluster(&kubectl)
        .live_image(&ns(), WorkloadKind::Deployment, &app)
        .await
        .unwrap();

    assert_eq!(image.as_deref(), Some("registry.example.com/team/app:old1234-7"));
    assert!(calls(&dir)[0].contains("get deployment app -n prod -o jsonpath="));
}

#[tokio::test]
async fn absent_workload_has_no_live_image() {
    let dir = TempDir::new().unwrap();
    let kubectl = fake_kubectl(
        &dir,
        "echo 'Error from server (NotFound): deployments.apps \"app\" not found' >&2\nexit 1",
    );
    let app = ResourceName::new("app").unwrap();

    let image = cluster(&kubectl)
        .live_image(&ns(), WorkloadKind::Deployment, &app)
        .await
        .unwrap();
    assert!(image.is_none());
}

#[tokio::test]
async fn apply_passes_manifest_and_namespace() {
    let dir = TempDir::new().unwrap();
    let kubectl = fake_kubectl(&dir, "echo 'statefulset.apps/database created'");

    cluster(&kubectl)
        .apply_manifest(&ns(), Path::new("k8s/database.yaml"))
        .await
        .unwrap();

    assert!(calls(&dir)[0].ends_with("apply -n prod -f k8s/database.yaml"));
}

#[tokio::test]
async fn wait_ready_succeeds() {
    let dir = TempDir::new().unwrap();
    let kubectl = fake_kubectl(&dir, "echo 'pod/database-0 condition met'");

    let readiness = cluster(&kubectl)
        .wait_ready(&ns(), &ReadinessProbe::new("app=postgres"), Duration::from_secs(10))
        .await
        .unwrap();

    assert_eq!(readiness, Readiness::Ready);
    let call = &calls(&dir)[0];
    assert!(call.contains("wait --for=condition=ready pod -l app=postgres -n prod"));
}

#[tokio::test]
async fn wait_timeout_is_degraded_not_error() {
    let dir = TempDir::new().unwrap();
    let kubectl = fake_kubectl(
        &dir,
        "echo 'error: timed out waiting for the condition on pods/database-0' >&2\nexit 1",
    );

    let readiness = cluster(&kubectl)
        .wait_ready(&ns(), &ReadinessProbe::new("app=postgres"), Duration::from_secs(2))
        .await
        .unwrap();

    assert!(!readiness.is_ready());
    assert!(matches!(readiness, Readiness::Degraded { ref reason } if reason.contains("timed out")));
}

#[tokio::test]
async fn namespace_status_is_parsed() {
    let dir = TempDir::new().unwrap();
    let kubectl = fake_kubectl(
        &dir,
        r#"cat <<'JSON'
{"items":[{"kind":"StatefulSet","metadata":{"name":"database"},"spec":{"replicas":1,"template":{"spec":{"containers":[{"image":"postgres:16"}]}}},"status":{"readyReplicas":1}}]}
JSON"#,
    );

    let status = cluster(&kubectl).namespace_status(&ns()).await.unwrap();

    assert_eq!(status.workloads.len(), 1);
    assert_eq!(status.workloads[0].name, "database");
    assert_eq!(status.workloads[0].images, ["postgres:16"]);
}
