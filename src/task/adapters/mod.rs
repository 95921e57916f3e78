//! Adapter implementations for task ports.
//!
//! - [`dataset`] maps task, resource and state records onto dataset tables.
//! - [`memory`] holds in-process plan and log stores and a scripted executor
//!   for tests and single-process deployments.
//! - [`filesystem`] persists plan artifacts and logs below a directory.

pub mod dataset;
pub mod filesystem;
pub mod memory;
