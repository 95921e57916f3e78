//! Step definitions for changeset flow scenarios.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
