//! Application services for changeset and component use cases.

mod changeset;
mod component;
mod error;

pub use changeset::ChangesetService;
pub use component::{ComponentService, CreateComponentRequest};
pub use error::{ChangesetServiceError, ChangesetServiceResult};
