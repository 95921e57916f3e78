//! Plans, applies, merges and rebases.
//!
//! All four task families share one state machine
//! ([`domain::TaskState`]) and are driven by one service each. Plans and
//! applies call out to a provisioning executor; merges and rebases call the
//! versioned store. The module follows hexagonal architecture:
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
