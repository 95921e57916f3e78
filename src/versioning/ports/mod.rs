//! Port contracts for branch-versioned storage.
//!
//! Ports define infrastructure-agnostic interfaces used by every service.

pub mod store;

pub use store::{VersionedStore, VersionedStoreError, VersionedStoreResult, WriteTransaction};
