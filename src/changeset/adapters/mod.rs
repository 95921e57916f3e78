//! Adapter implementations for changeset ports.
//!
//! [`dataset`] maps changesets and components onto dataset tables.

pub mod dataset;
