// ABOUTME: Image builder and publisher stage.
// ABOUTME: Logs in, builds once with registry cache, pushes version and latest tags.

use nonempty::NonEmpty;

use crate::backend::{BuildCache, BuildError, BuildRequest, ImageBuilder};
use crate::config::Config;

use super::context::ExecutionContext;
use super::error::PipelineError;
use super::identity::BuildIdentity;

/// The build request for `identity` under `config`.
pub fn build_request(config: &Config, identity: &BuildIdentity) -> Result<BuildRequest, BuildError> {
    let cache = identity
        .full_image_ref()
        .with_tag(&config.image.cache_tag)
        .map_err(|e| BuildError::BuildFailed(format!("cache reference: {e}")))?;

    Ok(BuildRequest {
        context: config.image.context.clone(),
        dockerfile: config.image.dockerfile.clone(),
        platform: config.image.platform.clone(),
        tags: NonEmpty {
            head: identity.full_image_ref().clone(),
            tail: vec![identity.latest_image_ref().clone()],
        },
        cache: BuildCache { reference: cache },
        push: true,
    })
}

/// Build and publish the image for `identity`.
///
/// # Errors
///
/// Registry login and push failures are `Publish`; everything else is `Build`.
pub async fn publish<B>(
    builder: &B,
    config: &Config,
    context: &ExecutionContext,
    identity: &BuildIdentity,
) -> Result<(), PipelineError>
where
    B: ImageBuilder + ?Sized,
{
    let request = build_request(config, identity).map_err(classify)?;

    builder
        .login(context.registry(), context.registry_credentials())
        .await
        .map_err(classify)?;

    builder.build_and_push(&request).await.map_err(classify)?;

    tracing::info!(
        image = %identity.full_image_ref(),
        latest = %identity.latest_image_ref(),
        "image published"
    );
    Ok(())
}

fn classify(source: BuildError) -> PipelineError {
    if source.is_publish_failure() {
        PipelineError::Publish { source }
    } else {
        PipelineError::Build { source }
    }
}
