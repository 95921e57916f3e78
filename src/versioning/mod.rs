//! Branch-versioned row storage for changeyard.
//!
//! Every record the orchestrator persists lives in a [`domain::Dataset`]
//! versioned by commits on named branches. The orchestration layer consumes
//! the store only through the [`ports::VersionedStore`] contract:
//!
//! - write transactions scoped to one branch, serialized per branch
//! - read-only checkouts of a branch tip or of a historical commit
//! - merge-base and head inspection
//! - branch merge, rebase, creation and deletion
//!
//! The module follows the same hexagonal split as the other contexts:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
