// ABOUTME: External collaborators of the pipeline and their CLI-backed implementations.
// ABOUTME: kubectl for the cluster, docker buildx for images, git for manifests.

mod buildx;
mod env_secrets;
mod git;
mod kubeconfig;
mod kubectl;
pub mod process;
pub mod traits;

pub use buildx::BuildxBuilder;
pub use env_secrets::EnvSecretStore;
pub use git::GitRepo;
pub use kubeconfig::{KubeconfigError, KubeconfigFile};
pub use kubectl::KubectlCluster;
pub use traits::*;
