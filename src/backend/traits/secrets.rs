// ABOUTME: Secret storage lookup trait.
// ABOUTME: Resolves named credential references into secret values.

use crate::types::Secret;

/// Read-only access to named secrets.
pub trait SecretStore: Send + Sync {
    /// `None` if the name is unknown or its value is empty.
    fn resolve(&self, name: &str) -> Option<Secret>;
}
