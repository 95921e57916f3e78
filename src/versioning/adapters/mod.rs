//! Adapter implementations for the versioned store port.

pub mod memory;
