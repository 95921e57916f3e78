//! Rebase records.

use super::{BranchSnapshot, Lifecycle, RebaseId, TaskKind, TaskRecord};
use crate::changeset::domain::ChangesetId;
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Request to replay a changeset onto the tip of main.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rebase {
    id: RebaseId,
    changeset_id: ChangesetId,
    snapshot: BranchSnapshot,
    #[serde(flatten)]
    lifecycle: Lifecycle,
}

impl Rebase {
    /// Creates a queued rebase.
    #[must_use]
    pub fn new(changeset_id: ChangesetId, snapshot: BranchSnapshot, clock: &impl Clock) -> Self {
        Self {
            id: RebaseId::new(),
            changeset_id,
            snapshot,
            lifecycle: Lifecycle::queued(clock),
        }
    }

    /// Returns merge-base and head at request time.
    #[must_use]
    pub const fn snapshot(&self) -> &BranchSnapshot {
        &self.snapshot
    }
}

impl TaskRecord for Rebase {
    type Id = RebaseId;

    const KIND: TaskKind = TaskKind::Rebase;

    fn id(&self) -> RebaseId {
        self.id
    }

    fn changeset_id(&self) -> ChangesetId {
        self.changeset_id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}
