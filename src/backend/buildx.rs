// ABOUTME: ImageBuilder implementation using docker login and docker buildx.
// ABOUTME: Classifies toolchain failures into build versus publish errors.

use super::process::{CommandOutput, Tool};
use super::traits::{BuildError, BuildRequest, ImageBuilder, RegistryCredentials};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

/// Markers in buildx output that mean the registry refused the push.
const PUSH_FAILURE_MARKERS: &[&str] = &[
    "failed to push",
    "push access denied",
    "denied: requested access",
    "unauthorized",
    "failed to authorize",
];

/// Docker CLI with the buildx plugin.
#[derive(Debug, Clone)]
pub struct BuildxBuilder {
    tool: Tool,
    build_timeout: Duration,
}

impl BuildxBuilder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            tool: Tool::new(program).timeout(Duration::from_secs(60)),
            build_timeout: Duration::from_secs(30 * 60),
        }
    }

    pub fn build_timeout(mut self, timeout: Duration) -> Self {
        self.build_timeout = timeout;
        self
    }

    /// Arguments for `docker buildx build`.
    pub fn build_args(request: &BuildRequest) -> Vec<String> {
        let mut args = vec![
            "buildx".to_string(),
            "build".to_string(),
            "--platform".to_string(),
            request.platform.clone(),
            "--file".to_string(),
            request.dockerfile.display().to_string(),
        ];

        for tag in request.tags.iter() {
            args.push("--tag".to_string());
            args.push(tag.to_string());
        }

        args.push("--cache-from".to_string());
        args.push(request.cache.cache_from());
        args.push("--cache-to".to_string());
        args.push(request.cache.cache_to());

        if request.push {
            args.push("--push".to_string());
        }

        args.push(request.context.display().to_string());
        args
    }
}

fn classify_build_failure(output: &CommandOutput) -> BuildError {
    let message = output.failure_message();
    if PUSH_FAILURE_MARKERS
        .iter()
        .any(|marker| output.stderr_contains(marker))
    {
        BuildError::PushFailed(message)
    } else {
        BuildError::BuildFailed(message)
    }
}

#[async_trait]
impl ImageBuilder for BuildxBuilder {
    async fn login(
        &self,
        registry: &str,
        credentials: &RegistryCredentials,
    ) -> Result<(), BuildError> {
        let args = [
            "login",
            registry,
            "--username",
            credentials.username.as_str(),
            "--password-stdin",
        ];

        let output = self
            .tool
            .run_with_stdin(args, credentials.password.expose())
            .await
            .map_err(|e| BuildError::LoginFailed(e.to_string()))?;

        if output.success() {
            tracing::info!(registry, "logged in to registry");
            Ok(())
        } else {
            Err(BuildError::LoginFailed(output.failure_message()))
        }
    }

    async fn build_and_push(&self, request: &BuildRequest) -> Result<(), BuildError> {
        let args = Self::build_args(request);
        tracing::info!(
            tags = ?request.tags.iter().map(ToString::to_string).collect::<Vec<_>>(),
            platform = %request.platform,
            "building image"
        );

        let output = self
            .tool
            .run_with_timeout(args, self.build_timeout)
            .await?;

        if output.success() {
            Ok(())
        } else {
            Err(classify_build_failure(&output))
        }
    }
}
