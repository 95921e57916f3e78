//! Changeset lifecycle service.

use super::{ChangesetServiceError, ChangesetServiceResult};
use crate::changeset::{
    domain::{Changeset, ChangesetDomainError, ChangesetName, ReviewState},
    ports::{ChangesetRepository, ChangesetRepositoryMut},
};
use crate::config::BranchLayout;
use crate::versioning::ports::VersionedStore;
use mockable::Clock;
use std::sync::Arc;
use tracing::{error, info};

/// Creates, reads and transitions changesets.
///
/// Changeset rows live on the main branch; each changeset owns a branch of
/// the same name forked from main.
#[derive(Clone)]
pub struct ChangesetService<S, C>
where
    S: VersionedStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    layout: BranchLayout,
}

impl<S, C> ChangesetService<S, C>
where
    S: VersionedStore,
    C: Clock + Send + Sync,
{
    /// Creates a changeset service.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>, layout: BranchLayout) -> Self {
        Self {
            store,
            clock,
            layout,
        }
    }

    /// Creates an open draft changeset and its branch.
    ///
    /// # Errors
    ///
    /// Returns [`ChangesetServiceError::Domain`] for an invalid name,
    /// [`ChangesetServiceError::ReservedName`] for the main or admin branch
    /// name, [`ChangesetServiceError::Duplicate`] when the name is taken and
    /// [`ChangesetServiceError::Store`] when the branch cannot be created.
    pub async fn create(&self, name: &str) -> ChangesetServiceResult<Changeset> {
        let changeset_name = ChangesetName::new(name)?;
        if self.layout.is_reserved(changeset_name.branch()) {
            return Err(ChangesetServiceError::ReservedName(changeset_name.to_string()));
        }

        let changeset = Changeset::new(changeset_name, &*self.clock);
        let mut tx = self.store.begin(self.layout.main()).await?;
        if tx.data().find_changeset_by_name(changeset.name())?.is_some() {
            return Err(ChangesetServiceError::Duplicate(changeset.name().to_string()));
        }
        tx.data_mut().store_changeset(&changeset)?;
        tx.commit(&format!("create changeset {}", changeset.name()))
            .await?;

        if let Err(err) = self
            .store
            .create_branch(changeset.branch(), self.layout.main())
            .await
        {
            self.discard(&changeset).await;
            return Err(err.into());
        }

        info!(changeset = %changeset.name(), id = %changeset.id(), "created changeset");
        Ok(changeset)
    }

    /// Returns the changeset with the given name.
    ///
    /// # Errors
    ///
    /// Returns [`ChangesetServiceError::NotFound`] when no changeset carries
    /// the name.
    pub async fn get(&self, name: &str) -> ChangesetServiceResult<Changeset> {
        let changeset_name = ChangesetName::new(name)?;
        let snapshot = self.store.checkout(self.layout.main()).await?;
        snapshot
            .data()
            .find_changeset_by_name(&changeset_name)?
            .ok_or_else(|| ChangesetServiceError::NotFound(changeset_name.to_string()))
    }

    /// Returns every changeset ordered by creation time.
    ///
    /// # Errors
    ///
    /// Returns [`ChangesetServiceError::Store`] or
    /// [`ChangesetServiceError::Repository`] when the read fails.
    pub async fn list(&self) -> ChangesetServiceResult<Vec<Changeset>> {
        let snapshot = self.store.checkout(self.layout.main()).await?;
        Ok(snapshot.data().list_changesets()?)
    }

    /// Moves the changeset review to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ChangesetServiceError::Domain`] when the changeset is not
    /// open or the transition is not allowed.
    pub async fn update_review_state(
        &self,
        name: &str,
        target: ReviewState,
    ) -> ChangesetServiceResult<Changeset> {
        self.mutate(name, "review", |changeset, clock| {
            changeset.review(target, clock)
        })
        .await
    }

    /// Closes an open changeset without merging it.
    ///
    /// # Errors
    ///
    /// Returns [`ChangesetServiceError::Domain`] when the changeset is not
    /// open.
    pub async fn close(&self, name: &str) -> ChangesetServiceResult<Changeset> {
        self.mutate(name, "close", |changeset, clock| changeset.close(clock))
            .await
    }

    async fn mutate<F>(&self, name: &str, action: &str, apply: F) -> ChangesetServiceResult<Changeset>
    where
        F: FnOnce(&mut Changeset, &C) -> Result<(), ChangesetDomainError>,
    {
        let changeset_name = ChangesetName::new(name)?;
        let mut tx = self.store.begin(self.layout.main()).await?;
        let mut changeset = tx
            .data()
            .find_changeset_by_name(&changeset_name)?
            .ok_or_else(|| ChangesetServiceError::NotFound(changeset_name.to_string()))?;
        apply(&mut changeset, &*self.clock)?;
        tx.data_mut().update_changeset(&changeset)?;
        tx.commit(&format!("{action} changeset {changeset_name}"))
            .await?;
        info!(
            changeset = %changeset_name,
            state = %changeset.state(),
            review = %changeset.review_state(),
            "updated changeset"
        );
        Ok(changeset)
    }

    async fn discard(&self, changeset: &Changeset) {
        let removal = async {
            let mut tx = self.store.begin(self.layout.main()).await?;
            tx.data_mut().delete_changeset(changeset.id());
            tx.commit(&format!("discard changeset {}", changeset.name()))
                .await
        };
        if let Err(err) = removal.await {
            error!(
                changeset = %changeset.name(),
                error = %err,
                "failed to discard changeset after branch creation failed"
            );
        }
    }
}
