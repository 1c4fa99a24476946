// ABOUTME: Scoped on-disk kubeconfig decoded from a base64 credential blob.
// ABOUTME: Written owner-only into a private temp dir and removed on drop.

use crate::types::Secret;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const KUBECONFIG_NAME: &str = "kubeconfig";

/// Errors from materializing cluster credentials.
#[derive(Debug, thiserror::Error)]
pub enum KubeconfigError {
    #[error("cluster credentials are not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("cluster credentials are not a kubeconfig: {0}")]
    InvalidContent(String),

    #[error("failed to write kubeconfig: {0}")]
    Io(#[from] std::io::Error),
}

/// A decoded kubeconfig that lives as long as this handle.
#[derive(Debug)]
pub struct KubeconfigFile {
    dir: TempDir,
    path: PathBuf,
}

impl KubeconfigFile {
    /// Decode `blob` into a fresh private directory under the system temp dir.
    pub fn materialize(blob: &Secret) -> Result<Self, KubeconfigError> {
        let dir = tempfile::Builder::new().prefix("shipline-").tempdir()?;
        Self::write_into(dir, blob)
    }

    /// Decode `blob` into a fresh private directory under `parent`.
    pub fn materialize_in(parent: &Path, blob: &Secret) -> Result<Self, KubeconfigError> {
        let dir = tempfile::Builder::new()
            .prefix("shipline-")
            .tempdir_in(parent)?;
        Self::write_into(dir, blob)
    }

    fn write_into(dir: TempDir, blob: &Secret) -> Result<Self, KubeconfigError> {
        let content = decode(blob)?;
        let path = dir.path().join(KUBECONFIG_NAME);

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&path)?;
        file.write_all(&content)?;
        file.sync_all()?;

        tracing::debug!(path = %path.display(), "kubeconfig written");
        Ok(Self { dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the credentials now, reporting any failure.
    pub fn close(self) -> std::io::Result<()> {
        self.dir.close()
    }
}

fn decode(blob: &Secret) -> Result<Vec<u8>, KubeconfigError> {
    let compact: String = blob
        .expose()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let bytes = STANDARD.decode(compact)?;

    let document: serde_yaml::Value = serde_yaml::from_slice(&bytes)
        .map_err(|e| KubeconfigError::InvalidContent(e.to_string()))?;
    if !document.is_mapping() {
        return Err(KubeconfigError::InvalidContent(
            "expected a YAML mapping".to_string(),
        ));
    }

    Ok(bytes)
}
