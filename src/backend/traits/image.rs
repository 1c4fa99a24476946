// ABOUTME: Image build and publish trait for the container toolchain.
// ABOUTME: Registry login plus a cache-layered build that pushes two tags.

use crate::backend::process::ProcessError;
use crate::types::{ImageRef, Secret};
use async_trait::async_trait;
use nonempty::NonEmpty;
use std::path::PathBuf;
use std::time::Duration;

/// Registry login credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: Secret,
}

/// Registry-stored build cache, read for hits and written in max mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCache {
    pub reference: ImageRef,
}

impl BuildCache {
    pub fn cache_from(&self) -> String {
        format!("type=registry,ref={}", self.reference)
    }

    pub fn cache_to(&self) -> String {
        format!("type=registry,ref={},mode=max", self.reference)
    }
}

/// Everything the toolchain needs for one build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub context: PathBuf,
    pub dockerfile: PathBuf,
    pub platform: String,
    /// Destination tags; the first is the immutable version tag.
    pub tags: NonEmpty<ImageRef>,
    pub cache: BuildCache,
    pub push: bool,
}

/// Build and publish operations.
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    async fn login(
        &self,
        registry: &str,
        credentials: &RegistryCredentials,
    ) -> Result<(), BuildError>;

    /// Build and, when requested, push every tag. Nothing is pushed on build failure.
    async fn build_and_push(&self, request: &BuildRequest) -> Result<(), BuildError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("registry login failed: {0}")]
    LoginFailed(String),

    #[error("image build failed: {0}")]
    BuildFailed(String),

    #[error("image push failed: {0}")]
    PushFailed(String),

    #[error("image build timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Process(ProcessError),
}

impl BuildError {
    /// Whether the failure happened while talking to the registry.
    pub fn is_publish_failure(&self) -> bool {
        matches!(self, BuildError::LoginFailed(_) | BuildError::PushFailed(_))
    }
}

impl From<ProcessError> for BuildError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Timeout { timeout, .. } => BuildError::Timeout(timeout),
            other => BuildError::Process(other),
        }
    }
}
