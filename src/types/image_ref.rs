// ABOUTME: Container image reference parsing and construction.
// ABOUTME: Handles registry/repository:tag@digest and derives tagged references.

use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character in image reference: {0}")]
    InvalidChar(char),

    #[error("invalid image reference format: {0}")]
    InvalidFormat(String),

    #[error("invalid tag: {0}")]
    InvalidTag(String),
}

/// A parsed container image reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    registry: Option<String>,
    name: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageRef {
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }

        if let Some(c) = input.chars().find(|c| !is_reference_char(*c)) {
            return Err(ParseImageRefError::InvalidChar(c));
        }

        let (without_digest, digest) = match input.split_once('@') {
            Some((before, after)) => (before, Some(after.to_string())),
            None => (input, None),
        };

        // A colon followed by a slash belongs to a registry port, not a tag.
        let (without_tag, tag) = match without_digest.rsplit_once(':') {
            Some((before, after)) if !after.contains('/') => (before, Some(after.to_string())),
            _ => (without_digest, None),
        };

        let (registry, name) = split_registry(without_tag)?;

        let tag = match (&tag, &digest) {
            (None, None) => Some("latest".to_string()),
            _ => tag,
        };

        Ok(Self {
            registry,
            name,
            tag,
            digest,
        })
    }

    /// Build a reference from a registry endpoint, a repository path and a tag.
    pub fn from_parts(
        registry: &str,
        repository: &str,
        tag: &str,
    ) -> Result<Self, ParseImageRefError> {
        let registry = registry.trim_end_matches('/');
        Self::parse(&format!("{registry}/{repository}:{tag}"))
    }

    /// The same repository under a different tag, dropping any digest.
    pub fn with_tag(&self, tag: &str) -> Result<Self, ParseImageRefError> {
        if tag.is_empty()
            || tag.len() > 128
            || tag.starts_with(['.', '-'])
            || !tag
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        {
            return Err(ParseImageRefError::InvalidTag(tag.to_string()));
        }

        Ok(Self {
            registry: self.registry.clone(),
            name: self.name.clone(),
            tag: Some(tag.to_string()),
            digest: None,
        })
    }

    /// Registry and repository without tag or digest, e.g. `ghcr.io/org/app`.
    pub fn repository(&self) -> String {
        match self.registry {
            Some(ref registry) => format!("{}/{}", registry, self.name),
            None => self.name.clone(),
        }
    }

    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }
}

fn is_reference_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '-' | '_' | '@')
}

fn split_registry(input: &str) -> Result<(Option<String>, String), ParseImageRefError> {
    if input.is_empty() || input.starts_with('/') || input.ends_with('/') {
        return Err(ParseImageRefError::InvalidFormat(input.to_string()));
    }

    match input.split_once('/') {
        None => Ok((None, input.to_string())),
        // The first component is a registry if it looks like a host.
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            Ok((Some(first.to_string()), rest.to_string()))
        }
        Some(_) => Ok((None, input.to_string())),
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repository())?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(ref digest) = self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

impl Serialize for ImageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_joins_registry_and_repository() {
        let image = ImageRef::from_parts("registry.example.com/", "team/app", "abc1234-42").unwrap();
        assert_eq!(image.registry(), Some("registry.example.com"));
        assert_eq!(image.name(), "team/app");
        assert_eq!(image.to_string(), "registry.example.com/team/app:abc1234-42");
    }

    #[test]
    fn registry_port_is_not_a_tag() {
        let image = ImageRef::parse("localhost:5000/app").unwrap();
        assert_eq!(image.registry(), Some("localhost:5000"));
        assert_eq!(image.tag(), Some("latest"));
    }

    #[test]
    fn with_tag_drops_digest() {
        let image = ImageRef::parse("ghcr.io/org/app:v1@sha256:abc").unwrap();
        let retagged = image.with_tag("latest").unwrap();
        assert_eq!(retagged.to_string(), "ghcr.io/org/app:latest");
    }

    #[test]
    fn with_tag_rejects_invalid_tags() {
        let image = ImageRef::parse("app").unwrap();
        assert!(image.with_tag("").is_err());
        assert!(image.with_tag("-leading").is_err());
        assert!(image.with_tag("has/slash").is_err());
    }
}
