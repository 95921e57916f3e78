//! Unit tests for the task context.

mod merge_service_tests;
