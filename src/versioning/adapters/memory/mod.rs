//! In-memory versioned store adapter.

mod graph;
mod store;

pub use store::InMemoryVersionedStore;
