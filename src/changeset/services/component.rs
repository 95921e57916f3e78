//! Component definition service.

use super::{ChangesetServiceError, ChangesetServiceResult};
use crate::changeset::{
    domain::{
        Changeset, ChangesetName, ChangesetState, Component, ComponentId, ComponentName,
        ModuleSource, Variables,
    },
    ports::{ChangesetRepository, ComponentRepository, ComponentRepositoryMut},
};
use crate::config::BranchLayout;
use crate::versioning::{domain::Snapshot, ports::VersionedStore};
use mockable::Clock;
use std::sync::Arc;
use tracing::info;

/// Request payload for creating a component inside a changeset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateComponentRequest {
    name: String,
    module_source: String,
    variables: Variables,
}

impl CreateComponentRequest {
    /// Creates a request with no variables.
    #[must_use]
    pub fn new(name: impl Into<String>, module_source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module_source: module_source.into(),
            variables: Variables::new(),
        }
    }

    /// Sets the module variables.
    #[must_use]
    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    /// Adds one module variable.
    #[must_use]
    pub fn with_variable(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.variables.insert(key.into(), value);
        self
    }
}

/// Creates, updates and reads components on changeset branches.
#[derive(Clone)]
pub struct ComponentService<S, C>
where
    S: VersionedStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    layout: BranchLayout,
}

impl<S, C> ComponentService<S, C>
where
    S: VersionedStore,
    C: Clock + Send + Sync,
{
    /// Creates a component service.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>, layout: BranchLayout) -> Self {
        Self {
            store,
            clock,
            layout,
        }
    }

    /// Creates a component on an open changeset's branch.
    ///
    /// # Errors
    ///
    /// Returns [`ChangesetServiceError::Domain`] for invalid input or a
    /// changeset that is not open, and
    /// [`ChangesetServiceError::DuplicateComponent`] when the name is taken on
    /// the branch.
    pub async fn create(
        &self,
        changeset: &str,
        request: CreateComponentRequest,
    ) -> ChangesetServiceResult<Component> {
        let name = ComponentName::new(request.name)?;
        let module_source = ModuleSource::new(request.module_source)?;
        let owner = self.open_changeset(changeset).await?;

        let mut tx = self.store.begin(owner.branch()).await?;
        if tx.data().find_component_by_name(&name)?.is_some() {
            return Err(ChangesetServiceError::DuplicateComponent(name.to_string()));
        }
        let component = Component::new(name, module_source, request.variables, &*self.clock);
        tx.data_mut().store_component(&component)?;
        tx.commit(&format!("create component {}", component.name()))
            .await?;

        info!(
            changeset = %owner.name(),
            component = %component.name(),
            id = %component.id(),
            "created component"
        );
        Ok(component)
    }

    /// Merges variable updates into a component; `null` values remove keys.
    ///
    /// # Errors
    ///
    /// Returns [`ChangesetServiceError::ComponentNotFound`] when the component
    /// does not exist on the branch.
    pub async fn update(
        &self,
        changeset: &str,
        id: ComponentId,
        variables: Variables,
    ) -> ChangesetServiceResult<Component> {
        let owner = self.open_changeset(changeset).await?;
        let mut tx = self.store.begin(owner.branch()).await?;
        let mut component = tx
            .data()
            .find_component(id)?
            .ok_or(ChangesetServiceError::ComponentNotFound(id))?;
        component.set_variables(variables);
        tx.data_mut().update_component(&component)?;
        tx.commit(&format!("update component {}", component.name()))
            .await?;

        info!(changeset = %owner.name(), component = %component.name(), "updated component");
        Ok(component)
    }

    /// Returns a component as seen by the changeset.
    ///
    /// Merged changesets resolve against the main branch.
    ///
    /// # Errors
    ///
    /// Returns [`ChangesetServiceError::NotFound`] or
    /// [`ChangesetServiceError::ComponentNotFound`].
    pub async fn get(&self, changeset: &str, id: ComponentId) -> ChangesetServiceResult<Component> {
        let snapshot = self.view(changeset).await?;
        snapshot
            .data()
            .find_component(id)?
            .ok_or(ChangesetServiceError::ComponentNotFound(id))
    }

    /// Returns every component visible to the changeset ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`ChangesetServiceError::NotFound`] when the changeset does not
    /// exist.
    pub async fn list(&self, changeset: &str) -> ChangesetServiceResult<Vec<Component>> {
        let snapshot = self.view(changeset).await?;
        Ok(snapshot.data().list_components()?)
    }

    async fn find_changeset(&self, changeset: &str) -> ChangesetServiceResult<Changeset> {
        let name = ChangesetName::new(changeset)?;
        let snapshot = self.store.checkout(self.layout.main()).await?;
        snapshot
            .data()
            .find_changeset_by_name(&name)?
            .ok_or_else(|| ChangesetServiceError::NotFound(name.to_string()))
    }

    async fn open_changeset(&self, changeset: &str) -> ChangesetServiceResult<Changeset> {
        let owner = self.find_changeset(changeset).await?;
        owner.ensure_open()?;
        Ok(owner)
    }

    async fn view(&self, changeset: &str) -> ChangesetServiceResult<Snapshot> {
        let owner = self.find_changeset(changeset).await?;
        let branch = match owner.state() {
            ChangesetState::Merged => self.layout.main(),
            ChangesetState::Open | ChangesetState::Closed => owner.branch(),
        };
        Ok(self.store.checkout(branch).await?)
    }
}
