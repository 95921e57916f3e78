//! Repository ports for changesets and components.

use crate::changeset::domain::{
    Changeset, ChangesetId, ChangesetName, Component, ComponentId, ComponentName,
};
use crate::versioning::domain::RecordResult;

/// Read access to changeset records.
pub trait ChangesetRepository {
    /// Finds a changeset by identifier.
    ///
    /// Returns `None` when the changeset does not exist.
    fn find_changeset(&self, id: ChangesetId) -> RecordResult<Option<Changeset>>;

    /// Finds a changeset by name.
    ///
    /// Returns `None` when no changeset carries the name.
    fn find_changeset_by_name(&self, name: &ChangesetName) -> RecordResult<Option<Changeset>>;

    /// Returns every changeset ordered by creation time.
    fn list_changesets(&self) -> RecordResult<Vec<Changeset>>;
}

/// Write access to changeset records.
pub trait ChangesetRepositoryMut: ChangesetRepository {
    /// Stores a new changeset.
    ///
    /// # Errors
    ///
    /// Returns [`crate::versioning::domain::RecordError::Duplicate`] when the
    /// identifier is already taken.
    fn store_changeset(&mut self, changeset: &Changeset) -> RecordResult<()>;

    /// Persists changes to an existing changeset.
    ///
    /// # Errors
    ///
    /// Returns [`crate::versioning::domain::RecordError::NotFound`] when the
    /// changeset does not exist.
    fn update_changeset(&mut self, changeset: &Changeset) -> RecordResult<()>;

    /// Deletes a changeset, returning whether a row was removed.
    fn delete_changeset(&mut self, id: ChangesetId) -> bool;
}

/// Read access to component records of one branch.
pub trait ComponentRepository {
    /// Finds a component by identifier.
    fn find_component(&self, id: ComponentId) -> RecordResult<Option<Component>>;

    /// Finds a component by name.
    fn find_component_by_name(&self, name: &ComponentName) -> RecordResult<Option<Component>>;

    /// Returns every component ordered by name.
    fn list_components(&self) -> RecordResult<Vec<Component>>;
}

/// Write access to component records of one branch.
pub trait ComponentRepositoryMut: ComponentRepository {
    /// Stores a new component.
    fn store_component(&mut self, component: &Component) -> RecordResult<()>;

    /// Persists changes to an existing component.
    fn update_component(&mut self, component: &Component) -> RecordResult<()>;
}
