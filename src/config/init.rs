// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates shipline.yml template files.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;
use super::deserialize::{validate_registry, validate_repository};

const TEMPLATE: &str = r#"image:
  registry: {registry}
  repository: {repository}
  platform: linux/amd64
  # context: .
  # dockerfile: Dockerfile

cluster:
  namespace: my-app
  workload: my-app
  # connect_timeout: 30s

# Names of the secrets holding credentials (resolved from the environment)
credentials:
  registry_username: REGISTRY_USERNAME
  registry_password: REGISTRY_PASSWORD
  kubeconfig: KUBE_CONFIG   # base64-encoded kubeconfig

infrastructure:
  database:
    manifest: k8s/infrastructure/postgres.yaml
    readiness: { selector: app=postgres }
    readiness_timeout: 5m
  cache:
    manifest: k8s/infrastructure/redis.yaml
    readiness: { selector: app=redis }
  reverse-proxy:
    manifest: k8s/infrastructure/nginx.yaml
    readiness: { selector: app=nginx }

# continue: log readiness timeouts and keep going; abort: fail the run
readiness_policy: continue

manifest:
  repo: .
  overlay: k8s/overlays/production/kustomization.yaml
  branch: main
  author:
    name: shipline
    email: shipline@example.com
"#;

pub fn init_config(
    dir: &Path,
    registry: Option<&str>,
    repository: Option<&str>,
    force: bool,
) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let registry = validate_registry(registry.unwrap_or("registry.example.com"))
        .map_err(Error::InvalidConfig)?;
    let repository =
        validate_repository(repository.unwrap_or("my-org/my-app")).map_err(Error::InvalidConfig)?;

    let yaml = TEMPLATE
        .replace("{registry}", &registry)
        .replace("{repository}", &repository);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}
