//! Branch and commit identifiers.

use super::VersioningDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validated name of a branch in the versioned store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    const MAX_LENGTH: usize = 100;

    /// Creates a validated branch name.
    ///
    /// # Errors
    ///
    /// Returns [`VersioningDomainError`] when the name is empty, too long, or
    /// contains characters a branch name may not carry.
    pub fn new(value: impl Into<String>) -> Result<Self, VersioningDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(VersioningDomainError::EmptyBranchName);
        }
        if normalized.chars().count() > Self::MAX_LENGTH {
            return Err(VersioningDomainError::BranchNameTooLong(raw));
        }

        let has_valid_chars = normalized
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-' | '/'));
        let is_valid = has_valid_chars
            && !normalized.contains("..")
            && !normalized.contains("//")
            && !normalized.starts_with(['-', '/'])
            && !normalized.ends_with('/');
        if !is_valid {
            return Err(VersioningDomainError::InvalidBranchName(raw));
        }

        Ok(Self(normalized.to_owned()))
    }

    /// Returns the branch name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = VersioningDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BranchName> for String {
    fn from(value: BranchName) -> Self {
        value.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content-addressed identifier of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    /// Wraps a commit digest produced by a store adapter.
    #[must_use]
    pub fn new(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    /// Returns the digest as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the first twelve characters, for log output.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
