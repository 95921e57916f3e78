//! Changeset aggregate root and lifecycle types.

use super::{ChangesetDomainError, ChangesetId, ParseChangesetStateError, ParseReviewStateError};
use crate::versioning::domain::BranchName;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Changeset lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangesetState {
    /// Work is in progress.
    Open,
    /// Work was abandoned without merging.
    Closed,
    /// The changeset was merged into the baseline and is read-only.
    Merged,
}

impl ChangesetState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Merged => "merged",
        }
    }
}

impl fmt::Display for ChangesetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ChangesetState {
    type Error = ParseChangesetStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            "merged" => Ok(Self::Merged),
            _ => Err(ParseChangesetStateError(value.to_owned())),
        }
    }
}

/// Review state of a changeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// Not yet submitted for review.
    Draft,
    /// Awaiting review.
    Pending,
    /// Approved for merging.
    Approved,
    /// Rejected by a reviewer or by a failed merge.
    Rejected,
}

impl ReviewState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Returns whether a reviewer may move from `self` to `target`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Draft, Self::Pending)
                | (Self::Pending, Self::Draft | Self::Approved | Self::Rejected)
                | (Self::Approved | Self::Rejected, Self::Pending | Self::Draft)
        )
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ReviewState {
    type Error = ParseReviewStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ParseReviewStateError(value.to_owned())),
        }
    }
}

/// Validated changeset name. Every changeset name is also its branch name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangesetName(BranchName);

impl ChangesetName {
    /// Creates a validated changeset name.
    ///
    /// # Errors
    ///
    /// Returns [`ChangesetDomainError::InvalidChangesetName`] when the value
    /// is not a valid branch name.
    pub fn new(value: impl Into<String>) -> Result<Self, ChangesetDomainError> {
        Ok(Self(BranchName::new(value)?))
    }

    /// Returns the branch backing the changeset.
    #[must_use]
    pub const fn branch(&self) -> &BranchName {
        &self.0
    }

    /// Returns the name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ChangesetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Changeset aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    id: ChangesetId,
    name: ChangesetName,
    state: ChangesetState,
    review_state: ReviewState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Changeset {
    /// Creates an open draft changeset.
    #[must_use]
    pub fn new(name: ChangesetName, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: ChangesetId::new(),
            name,
            state: ChangesetState::Open,
            review_state: ReviewState::Draft,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns the changeset identifier.
    #[must_use]
    pub const fn id(&self) -> ChangesetId {
        self.id
    }

    /// Returns the changeset name.
    #[must_use]
    pub const fn name(&self) -> &ChangesetName {
        &self.name
    }

    /// Returns the branch backing the changeset.
    #[must_use]
    pub const fn branch(&self) -> &BranchName {
        self.name.branch()
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ChangesetState {
        self.state
    }

    /// Returns the review state.
    #[must_use]
    pub const fn review_state(&self) -> ReviewState {
        self.review_state
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns `true` while the changeset accepts new work.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.state, ChangesetState::Open)
    }

    /// Fails unless the changeset is open.
    ///
    /// # Errors
    ///
    /// Returns [`ChangesetDomainError::ChangesetNotOpen`].
    pub fn ensure_open(&self) -> Result<(), ChangesetDomainError> {
        if self.is_open() {
            return Ok(());
        }
        Err(ChangesetDomainError::ChangesetNotOpen {
            name: self.name.to_string(),
            state: self.state,
        })
    }

    /// Moves the review to `target` on behalf of a reviewer.
    ///
    /// # Errors
    ///
    /// Returns [`ChangesetDomainError::ChangesetNotOpen`] for closed or merged
    /// changesets and [`ChangesetDomainError::InvalidReviewTransition`] for
    /// disallowed moves.
    pub fn review(&mut self, target: ReviewState, clock: &impl Clock) -> Result<(), ChangesetDomainError> {
        self.ensure_open()?;
        if !self.review_state.can_transition_to(target) {
            return Err(ChangesetDomainError::InvalidReviewTransition {
                from: self.review_state,
                to: target,
            });
        }
        self.review_state = target;
        self.touch(clock);
        Ok(())
    }

    /// Marks the changeset rejected after a failed merge.
    pub fn reject(&mut self, clock: &impl Clock) {
        self.review_state = ReviewState::Rejected;
        self.touch(clock);
    }

    /// Marks the changeset merged.
    ///
    /// # Errors
    ///
    /// Returns [`ChangesetDomainError::ChangesetNotOpen`] unless the changeset
    /// is open.
    pub fn mark_merged(&mut self, clock: &impl Clock) -> Result<(), ChangesetDomainError> {
        self.ensure_open()?;
        self.state = ChangesetState::Merged;
        self.touch(clock);
        Ok(())
    }

    /// Closes the changeset without merging.
    ///
    /// # Errors
    ///
    /// Returns [`ChangesetDomainError::ChangesetNotOpen`] unless the changeset
    /// is open.
    pub fn close(&mut self, clock: &impl Clock) -> Result<(), ChangesetDomainError> {
        self.ensure_open()?;
        self.state = ChangesetState::Closed;
        self.touch(clock);
        Ok(())
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
