//! Merge records and merge outcomes.

use super::{BranchSnapshot, Lifecycle, MergeId, PlanId, TaskKind, TaskRecord, TaskState};
use crate::changeset::domain::{ChangesetId, ComponentName};
use crate::versioning::domain::CommitId;
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason a merge was refused.
///
/// A rejection is a normal outcome: the merge ends Failed and the changeset
/// review becomes Rejected, but no error is reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum MergeRejection {
    /// The changeset received commits after the merge was requested.
    ChangesetMoved {
        /// Head recorded on the merge.
        recorded: CommitId,
        /// Head at run time.
        current: CommitId,
    },
    /// Main advanced past the recorded merge-base.
    MergeBaseMoved {
        /// Merge-base recorded on the merge.
        recorded: CommitId,
        /// Merge-base at run time.
        current: CommitId,
    },
    /// Main changed a component the changeset also changed.
    UpstreamChanged {
        /// Component changed on both sides.
        component: ComponentName,
    },
    /// A changed component was never planned.
    PlanMissing {
        /// Unplanned component.
        component: ComponentName,
    },
    /// The latest plan of a changed component did not succeed.
    PlanNotSucceeded {
        /// Component concerned.
        component: ComponentName,
        /// Latest plan.
        plan: PlanId,
        /// State of that plan.
        state: TaskState,
    },
    /// The latest plan of a changed component predates the current
    /// merge-base.
    PlanStale {
        /// Component concerned.
        component: ComponentName,
        /// Latest plan.
        plan: PlanId,
    },
    /// The component was edited after its latest plan was computed.
    PlanOutdated {
        /// Component concerned.
        component: ComponentName,
        /// Latest plan.
        plan: PlanId,
    },
    /// The store found conflicting changes while merging.
    Conflict {
        /// Conflicting `table/key.field` paths.
        paths: Vec<String>,
    },
}

impl fmt::Display for MergeRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChangesetMoved { recorded, current } => write!(
                f,
                "changeset moved from {} to {} after the merge was requested",
                recorded.short(),
                current.short()
            ),
            Self::MergeBaseMoved { recorded, current } => write!(
                f,
                "merge-base moved from {} to {}, rebase onto main first",
                recorded.short(),
                current.short()
            ),
            Self::UpstreamChanged { component } => write!(
                f,
                "component {component} changed on main, rebase onto main first"
            ),
            Self::PlanMissing { component } => write!(f, "component {component} has no plan"),
            Self::PlanNotSucceeded {
                component,
                plan,
                state,
            } => write!(f, "plan {plan} for component {component} is {state}"),
            Self::PlanStale { component, plan } => write!(
                f,
                "plan {plan} for component {component} predates the current merge-base"
            ),
            Self::PlanOutdated { component, plan } => write!(
                f,
                "component {component} changed after plan {plan}, plan it again"
            ),
            Self::Conflict { paths } => {
                write!(f, "conflicting changes at {}", paths.join(", "))
            }
        }
    }
}

/// Result of running a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The changeset was merged into main.
    Merged {
        /// Merge commit on main.
        commit: CommitId,
    },
    /// The merge was refused.
    Rejected(MergeRejection),
}

impl MergeOutcome {
    /// Returns `true` when the changeset was merged.
    #[must_use]
    pub const fn is_merged(&self) -> bool {
        matches!(self, Self::Merged { .. })
    }
}

/// Request to fold a changeset into main.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merge {
    id: MergeId,
    changeset_id: ChangesetId,
    snapshot: BranchSnapshot,
    rejection: Option<MergeRejection>,
    #[serde(flatten)]
    lifecycle: Lifecycle,
}

impl Merge {
    /// Creates a queued merge.
    #[must_use]
    pub fn new(changeset_id: ChangesetId, snapshot: BranchSnapshot, clock: &impl Clock) -> Self {
        Self {
            id: MergeId::new(),
            changeset_id,
            snapshot,
            rejection: None,
            lifecycle: Lifecycle::queued(clock),
        }
    }

    /// Returns merge-base and head at request time.
    #[must_use]
    pub const fn snapshot(&self) -> &BranchSnapshot {
        &self.snapshot
    }

    /// Returns why the merge was refused, if it was.
    #[must_use]
    pub const fn rejection(&self) -> Option<&MergeRejection> {
        self.rejection.as_ref()
    }

    /// Records why the merge was refused.
    pub fn record_rejection(&mut self, rejection: MergeRejection) {
        self.rejection = Some(rejection);
    }
}

impl TaskRecord for Merge {
    type Id = MergeId;

    const KIND: TaskKind = TaskKind::Merge;

    fn id(&self) -> MergeId {
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
