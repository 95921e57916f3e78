//! Changeset deletion.

use super::{OrchestrationError, OrchestrationResult, Provisioning, support::TaskContext};
use crate::changeset::{
    domain::{Changeset, ChangesetState},
    ports::ChangesetRepositoryMut,
};
use crate::config::BranchLayout;
use crate::task::{
    domain::{Apply, Merge, Plan, Rebase, TaskRecord},
    ports::{OperationKind, TaskRepository},
};
use crate::versioning::ports::VersionedStore;
use mockable::Clock;
use std::sync::Arc;
use tracing::info;

/// What a changeset deletion removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalSummary {
    /// Plans whose artifacts and logs were deleted.
    pub plans: usize,
    /// Applies whose logs were deleted.
    pub applies: usize,
    /// Merges moved to Cancelled.
    pub merges_cancelled: usize,
    /// Rebases moved to Cancelled.
    pub rebases_cancelled: usize,
}

/// Deletes unmerged changesets together with everything they produced.
#[derive(Clone)]
pub struct ChangesetRemovalService<S, C>
where
    S: VersionedStore,
    C: Clock + Send + Sync,
{
    ctx: TaskContext<S, C>,
    provisioning: Provisioning,
}

impl<S, C> ChangesetRemovalService<S, C>
where
    S: VersionedStore,
    C: Clock + Send + Sync,
{
    /// Creates a removal service.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        clock: Arc<C>,
        layout: BranchLayout,
        provisioning: Provisioning,
    ) -> Self {
        Self {
            ctx: TaskContext::new(store, clock, layout),
            provisioning,
        }
    }

    /// Deletes a changeset.
    ///
    /// Plan artifacts and the logs of its plans and applies are removed
    /// first, then pending merges and rebases are cancelled, the changeset
    /// row is deleted from main and finally its branch is deleted.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::ChangesetNotFound`],
    /// [`OrchestrationError::MergedChangeset`] for a merged changeset, or the
    /// first store failure.
    pub async fn delete_changeset(&self, name: &str) -> OrchestrationResult<RemovalSummary> {
        let owner = self.ctx.changeset_by_name(name).await?;
        if owner.state() == ChangesetState::Merged {
            return Err(OrchestrationError::MergedChangeset(owner.name().to_string()));
        }

        let mut summary = self.purge_outputs(&owner).await?;
        summary.merges_cancelled = self.remove_row(&owner).await?;
        summary.rebases_cancelled = self.cancel_rebases(&owner).await?;
        if self.ctx.store().branch_exists(owner.branch()).await? {
            self.ctx.store().delete_branch(owner.branch()).await?;
        }

        info!(
            changeset = %owner.name(),
            plans = summary.plans,
            applies = summary.applies,
            merges_cancelled = summary.merges_cancelled,
            rebases_cancelled = summary.rebases_cancelled,
            "deleted changeset"
        );
        Ok(summary)
    }

    async fn purge_outputs(&self, owner: &Changeset) -> OrchestrationResult<RemovalSummary> {
        let Some(snapshot) = self.ctx.checkout_if_exists(owner.branch()).await? else {
            return Ok(RemovalSummary::default());
        };
        let plans: Vec<Plan> = snapshot.data().tasks_for_changeset(owner.id())?;
        let applies: Vec<Apply> = snapshot.data().tasks_for_changeset(owner.id())?;

        let logs = self.provisioning.log_store();
        for plan in &plans {
            self.provisioning.plan_store().delete_plan(plan.id()).await?;
            logs.delete_log(OperationKind::Plan, plan.id().into_inner())?;
        }
        for apply in &applies {
            logs.delete_log(OperationKind::Apply, apply.id().into_inner())?;
        }
        Ok(RemovalSummary {
            plans: plans.len(),
            applies: applies.len(),
            ..RemovalSummary::default()
        })
    }

    async fn remove_row(&self, owner: &Changeset) -> OrchestrationResult<usize> {
        let mut tx = self.ctx.store().begin(self.ctx.main()).await?;
        let cancelled = self.ctx.cancel_pending::<Merge>(tx.data_mut(), owner.id())?;
        tx.data_mut().delete_changeset(owner.id());
        tx.commit(&format!("delete changeset {}", owner.name()))
            .await?;
        Ok(cancelled)
    }

    async fn cancel_rebases(&self, owner: &Changeset) -> OrchestrationResult<usize> {
        let admin = self.ctx.admin();
        if !self.ctx.store().branch_exists(admin).await? {
            return Ok(0);
        }
        let mut tx = self.ctx.store().begin(admin).await?;
        let cancelled = self.ctx.cancel_pending::<Rebase>(tx.data_mut(), owner.id())?;
        if cancelled > 0 {
            tx.commit(&format!("cancel rebases of {}", owner.name()))
                .await?;
        }
        Ok(cancelled)
    }
}
