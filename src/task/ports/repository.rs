//! Repository ports for task, resource and state records.

use crate::changeset::domain::{ChangesetId, ComponentId};
use crate::task::domain::{
    Apply, Plan, PlanId, ResourceRecord, StateRecord, TaskRecord, TaskState,
};
use crate::versioning::domain::{Record, RecordResult};

/// Read access to task records of one branch.
pub trait TaskRepository {
    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist on the branch.
    fn find_task<R>(&self, id: R::Id) -> RecordResult<Option<R>>
    where
        R: TaskRecord + Record;

    /// Returns the tasks in `state`, oldest first.
    fn tasks_in_state<R>(&self, state: TaskState) -> RecordResult<Vec<R>>
    where
        R: TaskRecord + Record;

    /// Returns the tasks of a changeset, oldest first.
    fn tasks_for_changeset<R>(&self, changeset: ChangesetId) -> RecordResult<Vec<R>>
    where
        R: TaskRecord + Record;

    /// Finds the apply created for a plan.
    fn apply_for_plan(&self, plan: PlanId) -> RecordResult<Option<Apply>>;

    /// Finds the most recently created plan of a component in a changeset.
    fn latest_plan_for_component(
        &self,
        changeset: ChangesetId,
        component: ComponentId,
    ) -> RecordResult<Option<Plan>>;
}

/// Write access to task records of one branch.
pub trait TaskRepositoryMut: TaskRepository {
    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`crate::versioning::domain::RecordError::Duplicate`] when the
    /// identifier is already taken.
    fn store_task<R>(&mut self, task: &R) -> RecordResult<()>
    where
        R: TaskRecord + Record;

    /// Stores a new apply, enforcing one apply per plan.
    ///
    /// # Errors
    ///
    /// Returns [`crate::versioning::domain::RecordError::Duplicate`] when the
    /// plan already has an apply.
    fn store_apply(&mut self, apply: &Apply) -> RecordResult<()>;

    /// Persists changes to an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`crate::versioning::domain::RecordError::NotFound`] when the
    /// task does not exist.
    fn update_task<R>(&mut self, task: &R) -> RecordResult<()>
    where
        R: TaskRecord + Record;

    /// Deletes a task, returning whether a row was removed.
    fn delete_task<R>(&mut self, id: R::Id) -> bool
    where
        R: TaskRecord + Record;
}

/// Read access to resource and state records.
pub trait ResourceRepository {
    /// Finds the latest state of a component.
    fn find_state(&self, component: ComponentId) -> RecordResult<Option<StateRecord>>;

    /// Returns the resources of a component ordered by address.
    fn list_resources(&self, component: ComponentId) -> RecordResult<Vec<ResourceRecord>>;
}

/// Write access to resource and state records.
pub trait ResourceRepositoryMut: ResourceRepository {
    /// Stores the state of a component, replacing any previous state.
    fn store_state(&mut self, state: &StateRecord) -> RecordResult<()>;

    /// Replaces every resource of `component` with `resources`.
    fn replace_resources(
        &mut self,
        component: ComponentId,
        resources: &[ResourceRecord],
    ) -> RecordResult<()>;
}
