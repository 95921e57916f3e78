//! Plan records.

use super::{BranchSnapshot, Lifecycle, PlanId, TaskKind, TaskRecord};
use crate::changeset::domain::{ChangesetId, ComponentId};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Resource counts reported by a provisioning plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceCounts {
    /// Resources to create.
    pub add: u32,
    /// Resources to update in place.
    pub change: u32,
    /// Resources to destroy.
    pub destroy: u32,
}

impl ResourceCounts {
    /// Creates counts.
    #[must_use]
    pub const fn new(add: u32, change: u32, destroy: u32) -> Self {
        Self {
            add,
            change,
            destroy,
        }
    }

    /// Returns `true` when the plan changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.add == 0 && self.change == 0 && self.destroy == 0
    }
}

/// A proposed diff for one component inside one changeset.
///
/// `snapshot` records merge-base and changeset head when the plan was
/// requested; the component is planned as of `snapshot.head()`.
/// `sequence` orders the plans of one component within a changeset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    id: PlanId,
    changeset_id: ChangesetId,
    component_id: ComponentId,
    sequence: u64,
    snapshot: BranchSnapshot,
    resource_counts: Option<ResourceCounts>,
    #[serde(flatten)]
    lifecycle: Lifecycle,
}

impl Plan {
    /// Creates a queued plan.
    #[must_use]
    pub fn new(
        changeset_id: ChangesetId,
        component_id: ComponentId,
        sequence: u64,
        snapshot: BranchSnapshot,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: PlanId::new(),
            changeset_id,
            component_id,
            sequence,
            snapshot,
            resource_counts: None,
            lifecycle: Lifecycle::queued(clock),
        }
    }

    /// Returns the planned component.
    #[must_use]
    pub const fn component_id(&self) -> ComponentId {
        self.component_id
    }

    /// Returns the position of this plan among the component's plans in
    /// the changeset, starting at zero.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns merge-base and head at request time.
    #[must_use]
    pub const fn snapshot(&self) -> &BranchSnapshot {
        &self.snapshot
    }

    /// Returns the counts, or `None` when planning did not get that far.
    #[must_use]
    pub const fn resource_counts(&self) -> Option<ResourceCounts> {
        self.resource_counts
    }

    /// Records the counts reported by the executor.
    pub const fn record_counts(&mut self, counts: ResourceCounts) {
        self.resource_counts = Some(counts);
    }
}

impl TaskRecord for Plan {
    type Id = PlanId;

    const KIND: TaskKind = TaskKind::Plan;

    fn id(&self) -> PlanId {
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
