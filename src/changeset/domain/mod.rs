//! Domain model for changesets and components.

mod changeset;
mod component;
mod diff;
mod error;
mod ids;

pub use changeset::{Changeset, ChangesetName, ChangesetState, ReviewState};
pub use component::{Component, ComponentName, ModuleSource, Variables};
pub use diff::{ChangeKind, ComponentChange, diff_components};
pub use error::{ChangesetDomainError, ParseChangesetStateError, ParseReviewStateError};
pub use ids::{ChangesetId, ComponentId};
