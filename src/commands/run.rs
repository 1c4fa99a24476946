// ABOUTME: Run command implementation.
// ABOUTME: Wires the CLI-backed collaborators into the pipeline, with hooks and reporting.

use shipline::backend::{
    BuildxBuilder, ClusterOps, EnvSecretStore, GitRepo, ImageBuilder, KubectlCluster,
    ManifestRepo,
};
use shipline::config::Config;
use shipline::diagnostics::{Diagnostics, Warning};
use shipline::error::{Error, Result};
use shipline::hooks::{HookContext, HookPoint, HookRunner};
use shipline::output::Output;
use shipline::pipeline::{
    BuildIdentity, FailureReport, HandedOff, Loaded, Pipeline, PipelineError,
};
use std::path::{Path, PathBuf};
use tokio::signal::unix::{SignalKind, signal};

/// Per-invocation inputs that do not live in the config file.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub commit: Option<String>,
    pub build_number: u64,
    pub rollback_file: Option<PathBuf>,
}

/// Run the whole pipeline once.
pub async fn run(
    config: Config,
    options: RunOptions,
    project_dir: &Path,
    output: &mut Output,
) -> Result<()> {
    output.start_timer();
    let hooks = HookRunner::new(project_dir);
    let mut diag = Diagnostics::default();

    let commit = match options.commit {
        Some(commit) => commit,
        None => GitRepo::new(&config.tools.git, project_dir)
            .head_commit()
            .await
            .map_err(|e| Error::Commit(e.to_string()))?,
    };
    let identity = BuildIdentity::new(&commit, options.build_number, &config.base_image()?)?;

    let mut hook_context = HookContext {
        namespace: config.cluster.namespace.clone(),
        image: Some(identity.full_image_ref().to_string()),
        version_tag: Some(identity.version_tag().to_string()),
        branch: config.manifest.branch.clone(),
        previous_image: None,
        error: None,
    };

    if let Some(result) = hooks.run(HookPoint::PreDeploy, &hook_context).await
        && !result.success
    {
        if !result.stderr.is_empty() {
            eprintln!("{}", result.stderr.trim_end());
        }
        return Err(Error::Hook("pre-deploy hook failed".to_string()));
    }

    output.progress(&format!(
        "Deploying {} to {}",
        identity.full_image_ref(),
        config.cluster.namespace
    ));

    let namespace = config.cluster.namespace.clone();
    let tools = config.tools.clone();
    let request_timeout = config.cluster.request_timeout;
    let build_timeout = config.image.build_timeout;
    let manifest_root = config.manifest.repo.clone();

    let pipeline = match Pipeline::load(config, &EnvSecretStore) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            let report = FailureReport::collect(&e, None::<&KubectlCluster>, &namespace).await;
            return Err(fail(e, report, &hooks, hook_context, output).await);
        }
    };

    let kubeconfig = match pipeline.materialize_kubeconfig() {
        Ok(kubeconfig) => kubeconfig,
        Err(e) => {
            let report = FailureReport::collect(&e, None::<&KubectlCluster>, &namespace).await;
            return Err(fail(e, report, &hooks, hook_context, output).await);
        }
    };

    let cluster =
        KubectlCluster::new(&tools.kubectl, kubeconfig.path()).request_timeout(request_timeout);
    let builder = BuildxBuilder::new(&tools.docker).build_timeout(build_timeout);
    let repo = GitRepo::new(&tools.git, manifest_root);

    let outcome = tokio::select! {
        outcome = drive(
            pipeline,
            identity,
            &cluster,
            &builder,
            &repo,
            output,
            &mut diag,
            options.rollback_file.as_deref(),
        ) => Ok(outcome),
        name = shutdown_signal() => Err(name),
    };

    // The in-flight child process is killed along with the dropped stage future.
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(name) => {
            if let Err(e) = kubeconfig.close() {
                output.warning(&format!("failed to remove scoped kubeconfig: {e}"));
            }
            return Err(Error::Interrupted(name.to_string()));
        }
    };

    // Diagnostics need the credentials, so collect them before cleanup.
    let outcome = match outcome {
        Ok(pipeline) => Ok(pipeline),
        Err(e) => {
            let report = FailureReport::collect(&e, Some(&cluster), &namespace).await;
            Err((e, report))
        }
    };

    if let Err(e) = kubeconfig.close() {
        diag.warn(Warning::credential_cleanup(format!(
            "failed to remove scoped kubeconfig: {e}"
        )));
    }

    match outcome {
        Ok(pipeline) => {
            hook_context.previous_image = pipeline.rollback().previous_image.clone();

            if let Some(result) = hooks.run(HookPoint::PostDeploy, &hook_context).await
                && !result.success
            {
                diag.warn(Warning::hook_failed(format!(
                    "post-deploy hook exited with {:?}",
                    result.exit_code
                )));
            }

            let summary = pipeline.finish(&diag);
            output.summary(&summary);
            Ok(())
        }
        Err((e, report)) => Err(fail(e, report, &hooks, hook_context, output).await),
    }
}

/// The pipeline stages, in order.
#[allow(clippy::too_many_arguments)]
async fn drive<C, B, R>(
    pipeline: Pipeline<Loaded>,
    identity: BuildIdentity,
    cluster: &C,
    builder: &B,
    repo: &R,
    output: &Output,
    diag: &mut Diagnostics,
    rollback_file: Option<&Path>,
) -> std::result::Result<Pipeline<HandedOff>, PipelineError>
where
    C: ClusterOps,
    B: ImageBuilder,
    R: ManifestRepo,
{
    output.progress("  → Connecting to cluster...");
    let pipeline = pipeline.connect(cluster).await?;
    output.progress(&format!(
        "  → Connected to {} ({} node(s))",
        pipeline.cluster().control_plane,
        pipeline.cluster().nodes.len()
    ));

    output.progress("  → Provisioning infrastructure...");
    let pipeline = pipeline.provision(cluster, diag).await?;
    if pipeline.infrastructure_deployed() {
        output.progress("  ✓ Infrastructure deployed");
    } else {
        output.progress("  ✓ Infrastructure already present");
    }

    output.progress(&format!(
        "  → Building and publishing {}...",
        identity.version_tag()
    ));
    let pipeline = pipeline.publish(builder, identity).await?;

    output.progress("  → Recording rollback point...");
    let pipeline = pipeline.record_rollback(cluster).await?;
    output.progress(&format!(
        "  ✓ Rollback point: {}",
        pipeline
            .rollback()
            .previous_image
            .as_deref()
            .unwrap_or("none (first deploy)")
    ));
    if let Some(path) = rollback_file
        && let Err(e) = pipeline.rollback().write_to(path)
    {
        diag.warn(Warning::rollback_artifact(format!(
            "failed to write {}: {e}",
            path.display()
        )));
    }

    output.progress("  → Updating desired state...");
    pipeline.update_desired_state(repo).await
}

/// Resolves with the signal name on SIGINT or SIGTERM.
async fn shutdown_signal() -> &'static str {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    let name = tokio::select! {
        () = interrupt => "SIGINT",
        () = terminate => "SIGTERM",
    };
    tracing::warn!(signal = name, "run interrupted");
    name
}

/// Report a fatal error and run the on-error hook.
async fn fail(
    error: PipelineError,
    report: FailureReport,
    hooks: &HookRunner,
    mut hook_context: HookContext,
    output: &Output,
) -> Error {
    output.failure(&report);

    hook_context.error = Some(error.to_string());
    if let Some(result) = hooks.run(HookPoint::OnError, &hook_context).await
        && !result.success
    {
        output.warning("on-error hook failed");
    }

    Error::Pipeline(error)
}
