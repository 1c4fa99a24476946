// ABOUTME: Status command implementation.
// ABOUTME: Shows the namespace's workloads and the live image of the main workload.

use serde::Serialize;
use shipline::backend::{ClusterOps, EnvSecretStore, KubectlCluster, NamespaceStatus};
use shipline::config::Config;
use shipline::error::{Error, Result};
use shipline::output::Output;
use shipline::pipeline::{Pipeline, PipelineError};

#[derive(Serialize)]
struct StatusView {
    live_image: Option<String>,
    #[serde(flatten)]
    status: NamespaceStatus,
}

pub async fn status(config: Config, output: &Output) -> Result<()> {
    let tools = config.tools.clone();
    let request_timeout = config.cluster.request_timeout;

    let pipeline = Pipeline::load(config, &EnvSecretStore).map_err(|e| reported(e, output))?;
    let kubeconfig = pipeline
        .materialize_kubeconfig()
        .map_err(|e| reported(e, output))?;
    let cluster =
        KubectlCluster::new(&tools.kubectl, kubeconfig.path()).request_timeout(request_timeout);

    let pipeline = pipeline
        .connect(&cluster)
        .await
        .map_err(|e| reported(e, output))?;
    let context = pipeline.context();

    let status = cluster.namespace_status(context.namespace()).await?;
    let live_image = cluster
        .live_image(
            context.namespace(),
            context.workload_kind(),
            context.workload(),
        )
        .await?;

    if let Err(e) = kubeconfig.close() {
        output.warning(&format!("failed to remove scoped kubeconfig: {e}"));
    }

    let mut lines = vec![format!(
        "{} {}/{}: {}",
        status.namespace,
        context.workload_kind(),
        context.workload(),
        live_image.as_deref().unwrap_or("not deployed")
    )];
    for workload in &status.workloads {
        lines.push(format!(
            "  {}/{} {}/{} ready",
            workload.kind, workload.name, workload.ready, workload.desired
        ));
    }

    output.value(&StatusView { live_image, status }, &lines);
    Ok(())
}

fn reported(error: PipelineError, output: &Output) -> Error {
    output.error(&error.to_string());
    Error::Pipeline(error)
}
