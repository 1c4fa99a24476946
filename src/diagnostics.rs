// ABOUTME: Diagnostics accumulator for non-fatal warnings during a deploy run.
// ABOUTME: Collects warnings that shouldn't fail the run but belong in its summary.

/// Collects non-fatal warnings during pipeline stages.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn has(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

/// A non-fatal warning collected during a run.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// A provisioned component did not become ready in time.
    pub fn readiness_degraded(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ReadinessDegraded,
            message: message.into(),
        }
    }

    /// The scoped kubeconfig could not be removed.
    pub fn credential_cleanup(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::CredentialCleanup,
            message: message.into(),
        }
    }

    /// A post-deploy or on-error hook failed.
    pub fn hook_failed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::HookFailed,
            message: message.into(),
        }
    }

    /// The rollback record could not be written to disk.
    pub fn rollback_artifact(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::RollbackArtifact,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    ReadinessDegraded,
    /// Kubeconfig left on disk after the run.
    CredentialCleanup,
    HookFailed,
    RollbackArtifact,
}
