//! Apply records.

use super::{ApplyId, Lifecycle, Plan, PlanId, TaskKind, TaskRecord};
use crate::changeset::domain::{ChangesetId, ComponentId};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Execution of exactly one successful plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Apply {
    id: ApplyId,
    plan_id: PlanId,
    changeset_id: ChangesetId,
    component_id: ComponentId,
    #[serde(flatten)]
    lifecycle: Lifecycle,
}

impl Apply {
    /// Creates a queued apply for `plan`.
    #[must_use]
    pub fn for_plan(plan: &Plan, clock: &impl Clock) -> Self {
        Self {
            id: ApplyId::new(),
            plan_id: plan.id(),
            changeset_id: plan.changeset_id(),
            component_id: plan.component_id(),
            lifecycle: Lifecycle::queued(clock),
        }
    }

    /// Returns the plan being applied.
    #[must_use]
    pub const fn plan_id(&self) -> PlanId {
        self.plan_id
    }

    /// Returns the component being applied.
    #[must_use]
    pub const fn component_id(&self) -> ComponentId {
        self.component_id
    }
}

impl TaskRecord for Apply {
    type Id = ApplyId;

    const KIND: TaskKind = TaskKind::Apply;

    fn id(&self) -> ApplyId {
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
