//! Domain model for orchestrated tasks.
//!
//! Plans, applies, merges and rebases share one state machine
//! ([`TaskState`]) and one set of lifecycle timestamps ([`Lifecycle`]). Every
//! record type implements [`TaskRecord`] so services can drive transitions
//! generically.

mod apply;
mod error;
mod ids;
mod merge;
mod plan;
mod rebase;
mod resource;
mod snapshot;
mod state;

pub use apply::Apply;
pub use error::{ParseTaskStateError, TaskDomainError};
pub use ids::{ApplyId, MergeId, PlanId, RebaseId, ResourceId};
pub use merge::{Merge, MergeOutcome, MergeRejection};
pub use plan::{Plan, ResourceCounts};
pub use rebase::Rebase;
pub use resource::{ResourceRecord, StateRecord};
pub use snapshot::BranchSnapshot;
pub use state::{Lifecycle, TaskKind, TaskRecord, TaskState};
