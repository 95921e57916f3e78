//! Shared task state machine.

use super::{ParseTaskStateError, TaskDomainError};
use crate::changeset::domain::ChangesetId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state shared by plans, applies, merges and rebases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Created and waiting for a worker.
    Queued,
    /// Picked up by a worker.
    Started,
    /// Finished successfully.
    Succeeded,
    /// Finished with an error or a rejection.
    Failed,
    /// Withdrawn before finishing.
    Cancelled,
    /// Interrupted by a process restart while started.
    Aborted,
}

impl TaskState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Started => "started",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Aborted => "aborted",
        }
    }

    /// Returns whether transition to `target` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Queued, Self::Started | Self::Cancelled)
                | (
                    Self::Started,
                    Self::Succeeded | Self::Failed | Self::Cancelled | Self::Aborted
                )
        )
    }

    /// Returns `true` for Succeeded, Failed and Cancelled.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Returns `true` when no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.is_completed() || matches!(self, Self::Aborted)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskState {
    type Error = ParseTaskStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "queued" => Ok(Self::Queued),
            "started" => Ok(Self::Started),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            "aborted" => Ok(Self::Aborted),
            _ => Err(ParseTaskStateError(value.to_owned())),
        }
    }
}

/// Task family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Provisioning preview of one component.
    Plan,
    /// Execution of a successful plan.
    Apply,
    /// Fold of a changeset into main.
    Merge,
    /// Replay of a changeset onto main.
    Rebase,
}

impl TaskKind {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Apply => "apply",
            Self::Merge => "merge",
            Self::Rebase => "rebase",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State and timestamps of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    state: TaskState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Lifecycle {
    /// Creates a queued lifecycle.
    #[must_use]
    pub fn queued(clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            state: TaskState::Queued,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.state
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Timestamp of the latest transition.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn transition(&mut self, target: TaskState, clock: &impl Clock) -> Result<(), TaskState> {
        if !self.state.can_transition_to(target) {
            return Err(self.state);
        }
        self.state = target;
        self.updated_at = clock.utc();
        Ok(())
    }
}

/// Common surface of plans, applies, merges and rebases.
pub trait TaskRecord {
    /// Identifier type.
    type Id: Copy + Eq + fmt::Display + fmt::Debug + Send + Sync + 'static;

    /// Task family.
    const KIND: TaskKind;

    /// Returns the task identifier.
    fn id(&self) -> Self::Id;

    /// Returns the changeset the task belongs to.
    fn changeset_id(&self) -> ChangesetId;

    /// Returns state and timestamps.
    fn lifecycle(&self) -> &Lifecycle;

    /// Returns mutable state and timestamps.
    fn lifecycle_mut(&mut self) -> &mut Lifecycle;

    /// Returns the current state.
    fn state(&self) -> TaskState {
        self.lifecycle().state()
    }

    /// Moves the task to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] when the state machine
    /// forbids the move; the record is left unchanged.
    fn transition_to(&mut self, target: TaskState, clock: &impl Clock) -> Result<(), TaskDomainError>
    where
        Self: Sized,
    {
        let id = self.id();
        self.lifecycle_mut()
            .transition(target, clock)
            .map_err(|from| TaskDomainError::InvalidTransition {
                kind: Self::KIND,
                id: id.to_string(),
                from,
                to: target,
            })
    }
}
