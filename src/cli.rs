// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use shipline::output::OutputMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shipline")]
#[command(about = "Build, publish and hand off container deployments to a GitOps controller")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Emit JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter shipline.yml in the current directory
    Init {
        /// Registry endpoint, e.g. registry.example.com
        #[arg(long)]
        registry: Option<String>,

        /// Repository path inside the registry, e.g. team/app
        #[arg(long)]
        repository: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Run the full pipeline: provision, publish, record, hand off
    Run {
        /// Target destination (defined in config)
        #[arg(short, long)]
        destination: Option<String>,

        /// Commit being deployed; defaults to the checked-out HEAD
        #[arg(long, env = "SHIPLINE_COMMIT")]
        commit: Option<String>,

        /// CI build number
        #[arg(long, env = "BUILD_NUMBER")]
        build_number: u64,

        /// Write the rollback record to this file
        #[arg(long)]
        rollback_file: Option<PathBuf>,
    },

    /// Show workloads and the live image in the target namespace
    Status {
        /// Target destination (defined in config)
        #[arg(short, long)]
        destination: Option<String>,
    },

    /// Print the version tag (and image references) for a build
    Identity {
        /// Commit being deployed
        #[arg(long, env = "SHIPLINE_COMMIT")]
        commit: String,

        /// CI build number
        #[arg(long, env = "BUILD_NUMBER")]
        build_number: u64,
    },
}
