// ABOUTME: Build identity derived from a commit and a CI build number.
// ABOUTME: Produces the immutable version tag and both published image references.

use crate::types::{ImageRef, ParseImageRefError};
use serde::Serialize;
use thiserror::Error;

/// Length of the abbreviated commit used in tags.
pub const SHORT_COMMIT_LEN: usize = 7;

/// Shortest abbreviated commit accepted as input.
const MIN_COMMIT_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("commit cannot be empty")]
    EmptyCommit,

    #[error("commit must be hexadecimal: {0}")]
    NotHex(String),

    #[error("commit is shorter than {MIN_COMMIT_LEN} characters: {0}")]
    TooShort(String),

    #[error("invalid image reference: {0}")]
    Reference(#[from] ParseImageRefError),
}

/// Identity of one build, computed once after checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildIdentity {
    commit_short: String,
    build_number: u64,
    version_tag: String,
    full_image_ref: ImageRef,
    latest_image_ref: ImageRef,
}

impl BuildIdentity {
    /// Derive the identity for `commit` and `build_number` under `repository`.
    ///
    /// Only the registry and repository of `repository` are used.
    pub fn new(
        commit: &str,
        build_number: u64,
        repository: &ImageRef,
    ) -> Result<Self, IdentityError> {
        let commit_short = short_commit(commit)?;
        let version_tag = version_tag(&commit_short, build_number);

        Ok(Self {
            full_image_ref: repository.with_tag(&version_tag)?,
            latest_image_ref: repository.with_tag("latest")?,
            commit_short,
            build_number,
            version_tag,
        })
    }

    pub fn commit_short(&self) -> &str {
        &self.commit_short
    }

    pub fn build_number(&self) -> u64 {
        self.build_number
    }

    /// `<commit_short>-<build_number>`.
    pub fn version_tag(&self) -> &str {
        &self.version_tag
    }

    pub fn full_image_ref(&self) -> &ImageRef {
        &self.full_image_ref
    }

    pub fn latest_image_ref(&self) -> &ImageRef {
        &self.latest_image_ref
    }
}

/// Normalize a commit id to its lowercase abbreviated form.
pub fn short_commit(commit: &str) -> Result<String, IdentityError> {
    let commit = commit.trim();
    if commit.is_empty() {
        return Err(IdentityError::EmptyCommit);
    }
    if !commit.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(IdentityError::NotHex(commit.to_string()));
    }
    if commit.len() < MIN_COMMIT_LEN {
        return Err(IdentityError::TooShort(commit.to_string()));
    }

    let end = commit.len().min(SHORT_COMMIT_LEN);
    Ok(commit[..end].to_ascii_lowercase())
}

pub fn version_tag(commit_short: &str, build_number: u64) -> String {
    format!("{commit_short}-{build_number}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository() -> ImageRef {
        ImageRef::parse("registry.example.com/team/app").unwrap()
    }

    #[test]
    fn identity_for_short_commit() {
        let identity = BuildIdentity::new("abc1234", 42, &repository()).unwrap();

        assert_eq!(identity.commit_short(), "abc1234");
        assert_eq!(identity.build_number(), 42);
        assert_eq!(identity.version_tag(), "abc1234-42");
        assert_eq!(
            identity.full_image_ref().to_string(),
            "registry.example.com/team/app:abc1234-42"
        );
        assert_eq!(
            identity.latest_image_ref().to_string(),
            "registry.example.com/team/app:latest"
        );
    }

    #[test]
    fn full_sha_is_abbreviated_and_lowercased() {
        let identity = BuildIdentity::new(
            "ABC1234DEF5678901234567890ABCDEF01234567",
            7,
            &repository(),
        )
        .unwrap();
        assert_eq!(identity.version_tag(), "abc1234-7");
    }

    #[test]
    fn repository_tag_is_ignored() {
        let tagged = ImageRef::parse("registry.example.com/team/app:old").unwrap();
        let identity = BuildIdentity::new("abc1234", 1, &tagged).unwrap();
        assert_eq!(
            identity.full_image_ref().to_string(),
            "registry.example.com/team/app:abc1234-1"
        );
    }

    #[test]
    fn rejects_bad_commits() {
        assert!(matches!(short_commit(""), Err(IdentityError::EmptyCommit)));
        assert!(matches!(short_commit("main"), Err(IdentityError::NotHex(_))));
        assert!(matches!(short_commit("abc"), Err(IdentityError::TooShort(_))));
    }
}
