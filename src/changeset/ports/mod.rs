//! Port contracts for changeset and component persistence.
//!
//! Repositories are typed views over the dataset of one branch. Read traits
//! are implemented for snapshots and open transactions alike; the `Mut`
//! variants only for the working dataset of a transaction.

pub mod repository;

pub use repository::{
    ChangesetRepository, ChangesetRepositoryMut, ComponentRepository, ComponentRepositoryMut,
};
