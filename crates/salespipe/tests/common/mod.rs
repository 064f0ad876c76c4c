//! Shared test utilities for salespipe integration tests.
//!
//! Provides `TestHarness` for isolated runs against temp directories and
//! an in-memory store, plus CSV fixture writers.

pub mod harness;

pub use harness::TestHarness;
