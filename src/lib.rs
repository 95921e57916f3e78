//! Changeyard: change management for provisioned infrastructure.
//!
//! Infrastructure components are versioned rows in a branch-versioned store.
//! Work happens in changesets, each backed by its own branch. Components are
//! planned through a provisioning executor, folded into main by merges that
//! re-validate their snapshot at run time, and applied once merged.
//!
//! # Architecture
//!
//! Each bounded context follows hexagonal architecture:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports
//!
//! # Modules
//!
//! - [`versioning`]: Branch-versioned transactional row storage
//! - [`changeset`]: Changesets, components and component diffs
//! - [`task`]: Plan, apply, merge and rebase orchestration
//! - [`worker`]: Push queues and recovery sweeps driving task services
//! - [`facade`]: One entry point composing every service
//! - [`config`]: Orchestrator configuration
//! - [`telemetry`]: Tracing subscriber setup

pub mod changeset;
pub mod config;
pub mod facade;
pub mod task;
pub mod telemetry;
pub mod versioning;
pub mod worker;
