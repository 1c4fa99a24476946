// ABOUTME: Capability traits for the pipeline's external collaborators.
// ABOUTME: Defines ClusterOps, ImageBuilder, ManifestRepo, and SecretStore.

mod cluster;
mod image;
mod repo;
mod secrets;

pub use cluster::{
    ClusterError, ClusterOps, NamespaceStatus, Readiness, ReadinessProbe, WorkloadKind,
    WorkloadStatus,
};
pub use image::{BuildCache, BuildError, BuildRequest, ImageBuilder, RegistryCredentials};
pub use repo::{CommitAuthor, ManifestRepo, RepoError};
pub use secrets::SecretStore;
