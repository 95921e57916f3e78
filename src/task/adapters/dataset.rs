//! Dataset-backed task, resource and state repositories.

use crate::changeset::domain::{ChangesetId, ComponentId};
use crate::task::{
    domain::{
        Apply, Merge, Plan, PlanId, Rebase, ResourceRecord, StateRecord, TaskRecord, TaskState,
    },
    ports::{ResourceRepository, ResourceRepositoryMut, TaskRepository, TaskRepositoryMut},
};
use crate::versioning::domain::{Dataset, Record, RecordError, RecordResult};

impl Record for Plan {
    const TABLE: &'static str = "plans";

    fn key(&self) -> String {
        self.id().to_string()
    }
}

impl Record for Apply {
    const TABLE: &'static str = "applies";

    fn key(&self) -> String {
        self.id().to_string()
    }
}

impl Record for Merge {
    const TABLE: &'static str = "merges";

    fn key(&self) -> String {
        self.id().to_string()
    }
}

impl Record for Rebase {
    const TABLE: &'static str = "rebases";

    fn key(&self) -> String {
        self.id().to_string()
    }
}

impl Record for ResourceRecord {
    const TABLE: &'static str = "resources";

    fn key(&self) -> String {
        self.id().to_string()
    }
}

impl Record for StateRecord {
    const TABLE: &'static str = "states";

    fn key(&self) -> String {
        self.component_id().to_string()
    }
}

fn oldest_first<R: TaskRecord>(mut tasks: Vec<R>) -> Vec<R> {
    tasks.sort_by_key(|task| task.lifecycle().created_at());
    tasks
}

impl TaskRepository for Dataset {
    fn find_task<R>(&self, id: R::Id) -> RecordResult<Option<R>>
    where
        R: TaskRecord + Record,
    {
        self.find(&id.to_string())
    }

    fn tasks_in_state<R>(&self, state: TaskState) -> RecordResult<Vec<R>>
    where
        R: TaskRecord + Record,
    {
        let tasks = self
            .all::<R>()?
            .into_iter()
            .filter(|task| task.state() == state)
            .collect();
        Ok(oldest_first(tasks))
    }

    fn tasks_for_changeset<R>(&self, changeset: ChangesetId) -> RecordResult<Vec<R>>
    where
        R: TaskRecord + Record,
    {
        let tasks = self
            .all::<R>()?
            .into_iter()
            .filter(|task| task.changeset_id() == changeset)
            .collect();
        Ok(oldest_first(tasks))
    }

    fn apply_for_plan(&self, plan: PlanId) -> RecordResult<Option<Apply>> {
        Ok(self
            .all::<Apply>()?
            .into_iter()
            .find(|apply| apply.plan_id() == plan))
    }

    fn latest_plan_for_component(
        &self,
        changeset: ChangesetId,
        component: ComponentId,
    ) -> RecordResult<Option<Plan>> {
        Ok(self
            .tasks_for_changeset::<Plan>(changeset)?
            .into_iter()
            .filter(|plan| plan.component_id() == component)
            .max_by_key(|plan| (plan.sequence(), plan.lifecycle().created_at())))
    }
}

impl TaskRepositoryMut for Dataset {
    fn store_task<R>(&mut self, task: &R) -> RecordResult<()>
    where
        R: TaskRecord + Record,
    {
        self.insert(task)
    }

    fn store_apply(&mut self, apply: &Apply) -> RecordResult<()> {
        if self.apply_for_plan(apply.plan_id())?.is_some() {
            return Err(RecordError::Duplicate {
                table: Apply::TABLE,
                key: apply.plan_id().to_string(),
            });
        }
        self.insert(apply)
    }

    fn update_task<R>(&mut self, task: &R) -> RecordResult<()>
    where
        R: TaskRecord + Record,
    {
        self.update(task)
    }

    fn delete_task<R>(&mut self, id: R::Id) -> bool
    where
        R: TaskRecord + Record,
    {
        self.delete::<R>(&id.to_string())
    }
}

impl ResourceRepository for Dataset {
    fn find_state(&self, component: ComponentId) -> RecordResult<Option<StateRecord>> {
        self.find(&component.to_string())
    }

    fn list_resources(&self, component: ComponentId) -> RecordResult<Vec<ResourceRecord>> {
        let mut resources: Vec<ResourceRecord> = self
            .all::<ResourceRecord>()?
            .into_iter()
            .filter(|resource| resource.component_id() == component)
            .collect();
        resources.sort_by(|left, right| left.address().cmp(right.address()));
        Ok(resources)
    }
}

impl ResourceRepositoryMut for Dataset {
    fn store_state(&mut self, state: &StateRecord) -> RecordResult<()> {
        self.upsert(state)
    }

    fn replace_resources(
        &mut self,
        component: ComponentId,
        resources: &[ResourceRecord],
    ) -> RecordResult<()> {
        for stale in self.list_resources(component)? {
            self.delete::<ResourceRecord>(&stale.key());
        }
        resources
            .iter()
            .try_for_each(|resource| self.insert(resource))
    }
}
