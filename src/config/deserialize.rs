// ABOUTME: Custom serde deserializers for config values.
// ABOUTME: Validates registry endpoints and repository paths.

use serde::Deserialize;

pub fn deserialize_registry<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    validate_registry(&s).map_err(serde::de::Error::custom)
}

pub fn deserialize_repository<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    validate_repository(&s).map_err(serde::de::Error::custom)
}

/// A registry host, optionally with a port. Trailing slashes are dropped.
pub fn validate_registry(value: &str) -> Result<String, String> {
    let registry = value.trim().trim_end_matches('/');
    if registry.is_empty() {
        return Err("registry cannot be empty".to_string());
    }

    if let Some(c) = registry
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '.' | '-' | ':'))
    {
        return Err(format!("invalid character in registry: '{c}'"));
    }

    // Without a dot or port the first path component reads as an image name.
    if !registry.contains('.') && !registry.contains(':') && registry != "localhost" {
        return Err(format!(
            "registry must be a host name (with a dot or port): {registry}"
        ));
    }

    Ok(registry.to_string())
}

/// A lowercase repository path like `team/app`.
pub fn validate_repository(value: &str) -> Result<String, String> {
    let repository = value.trim();
    if repository.is_empty() {
        return Err("repository cannot be empty".to_string());
    }

    for segment in repository.split('/') {
        if segment.is_empty() {
            return Err(format!("empty path segment in repository: {repository}"));
        }
        if let Some(c) = segment.chars().find(|c| {
            !c.is_ascii_lowercase() && !c.is_ascii_digit() && !matches!(c, '.' | '-' | '_')
        }) {
            return Err(format!("invalid character in repository: '{c}'"));
        }
    }

    Ok(repository.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_accepts_hosts_and_ports() {
        assert_eq!(validate_registry("ghcr.io/").unwrap(), "ghcr.io");
        assert_eq!(validate_registry("localhost:5000").unwrap(), "localhost:5000");
        assert_eq!(validate_registry("localhost").unwrap(), "localhost");
    }

    #[test]
    fn registry_rejects_bare_names() {
        assert!(validate_registry("myregistry").is_err());
        assert!(validate_registry("").is_err());
        assert!(validate_registry("reg.io/path").is_err());
    }

    #[test]
    fn repository_rules() {
        assert_eq!(validate_repository("team/app").unwrap(), "team/app");
        assert!(validate_repository("Team/app").is_err());
        assert!(validate_repository("team//app").is_err());
        assert!(validate_repository("team/app:v1").is_err());
    }
}
