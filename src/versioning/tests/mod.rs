//! Unit tests for the versioning context.

mod dataset_tests;
