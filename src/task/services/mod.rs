//! Task orchestration services.
//!
//! One service per task family: [`PlanService`], [`ApplyService`],
//! [`MergeService`] and [`RebaseService`], plus
//! [`ChangesetRemovalService`]. Each `run_*` entry point moves its task from
//! Queued to Started and always leaves it in a terminal state; when a step
//! fails the task is marked Failed before the error is returned.

mod apply;
mod deadline;
mod error;
mod merge;
mod plan;
mod provisioning;
mod rebase;
mod removal;
mod support;

pub use apply::ApplyService;
pub use deadline::Deadline;
pub use error::{OrchestrationError, OrchestrationResult};
pub use merge::MergeService;
pub use plan::{PlanJob, PlanService};
pub use provisioning::Provisioning;
pub use rebase::RebaseService;
pub use removal::{ChangesetRemovalService, RemovalSummary};
