//! Changesets and the components they version.
//!
//! A changeset is an isolated line of work backed by a branch of the
//! versioned store. Components are versioned rows on those branches. The
//! module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
