// ABOUTME: Application-wide error types for shipline.
// ABOUTME: Uses thiserror for ergonomic error handling.

use crate::backend::ClusterError;
use crate::pipeline::{IdentityError, PipelineError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("unknown destination: {0}")]
    UnknownDestination(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("could not determine the commit to deploy: {0}")]
    Commit(String),

    #[error("invalid build identity: {0}")]
    Identity(#[from] IdentityError),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error("interrupted by {0}; scoped credentials removed")]
    Interrupted(String),

    #[error("hook failed: {0}")]
    Hook(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
