//! Dataset-backed changeset and component repositories.

use crate::changeset::{
    domain::{Changeset, ChangesetId, ChangesetName, Component, ComponentId, ComponentName},
    ports::{
        ChangesetRepository, ChangesetRepositoryMut, ComponentRepository, ComponentRepositoryMut,
    },
};
use crate::versioning::domain::{Dataset, Record, RecordResult};

impl Record for Changeset {
    const TABLE: &'static str = "changesets";

    fn key(&self) -> String {
        self.id().to_string()
    }
}

impl Record for Component {
    const TABLE: &'static str = "components";

    fn key(&self) -> String {
        self.id().to_string()
    }
}

impl ChangesetRepository for Dataset {
    fn find_changeset(&self, id: ChangesetId) -> RecordResult<Option<Changeset>> {
        self.find(&id.to_string())
    }

    fn find_changeset_by_name(&self, name: &ChangesetName) -> RecordResult<Option<Changeset>> {
        Ok(self
            .all::<Changeset>()?
            .into_iter()
            .find(|changeset| changeset.name() == name))
    }

    fn list_changesets(&self) -> RecordResult<Vec<Changeset>> {
        let mut changesets = self.all::<Changeset>()?;
        changesets.sort_by_key(|changeset| (changeset.created_at(), changeset.id()));
        Ok(changesets)
    }
}

impl ChangesetRepositoryMut for Dataset {
    fn store_changeset(&mut self, changeset: &Changeset) -> RecordResult<()> {
        self.insert(changeset)
    }

    fn update_changeset(&mut self, changeset: &Changeset) -> RecordResult<()> {
        self.update(changeset)
    }

    fn delete_changeset(&mut self, id: ChangesetId) -> bool {
        self.delete::<Changeset>(&id.to_string())
    }
}

impl ComponentRepository for Dataset {
    fn find_component(&self, id: ComponentId) -> RecordResult<Option<Component>> {
        self.find(&id.to_string())
    }

    fn find_component_by_name(&self, name: &ComponentName) -> RecordResult<Option<Component>> {
        Ok(self
            .all::<Component>()?
            .into_iter()
            .find(|component| component.name() == name))
    }

    fn list_components(&self) -> RecordResult<Vec<Component>> {
        let mut components = self.all::<Component>()?;
        components.sort_by(|left, right| left.name().cmp(right.name()));
        Ok(components)
    }
}

impl ComponentRepositoryMut for Dataset {
    fn store_component(&mut self, component: &Component) -> RecordResult<()> {
        self.insert(component)
    }

    fn update_component(&mut self, component: &Component) -> RecordResult<()> {
        self.update(component)
    }
}
