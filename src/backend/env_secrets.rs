// ABOUTME: SecretStore backed by the process environment.
// ABOUTME: CI systems inject secrets as environment variables.

use super::traits::SecretStore;
use crate::types::Secret;

/// Resolves secret names as environment variable names.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn resolve(&self, name: &str) -> Option<Secret> {
        match std::env::var(name) {
            Ok(value) if !value.trim().is_empty() => Some(Secret::new(value)),
            _ => None,
        }
    }
}
