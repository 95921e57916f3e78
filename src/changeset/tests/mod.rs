//! Unit tests for the changeset context.

mod diff_tests;
