// ABOUTME: Entry point for the shipline CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use shipline::config::{self, Config};
use shipline::error::{Error, Result};
use shipline::output::Output;
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbose flag when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("shipline=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mut output = Output::new(cli.output_mode());

    if let Err(e) = run(cli, &mut output).await {
        // Pipeline failures were already reported in full.
        if !matches!(e, Error::Pipeline(_)) {
            output.error(&e.to_string());
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &mut Output) -> Result<()> {
    let cwd = env::current_dir()?;

    match cli.command {
        Commands::Init {
            registry,
            repository,
            force,
        } => {
            config::init_config(&cwd, registry.as_deref(), repository.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Run {
            destination,
            commit,
            build_number,
            rollback_file,
        } => {
            let config = load_config(&cwd, destination.as_deref())?;
            let options = commands::RunOptions {
                commit,
                build_number,
                rollback_file,
            };
            commands::run(config, options, &cwd, output).await
        }
        Commands::Status { destination } => {
            let config = load_config(&cwd, destination.as_deref())?;
            commands::status(config, output).await
        }
        Commands::Identity {
            commit,
            build_number,
        } => {
            let config = match Config::discover(&cwd) {
                Ok(config) => Some(config),
                Err(Error::ConfigNotFound(_)) => None,
                Err(e) => return Err(e),
            };
            commands::identity(config.as_ref(), &commit, build_number, output)
        }
    }
}

fn load_config(cwd: &Path, destination: Option<&str>) -> Result<Config> {
    let config = Config::discover(cwd)?;
    match destination {
        Some(dest) => config.for_destination(dest),
        None => Ok(config),
    }
}
