//! Shared test utilities for underwriter integration tests.
//!
//! This module provides:
//! - `TestHarness` with a temp-dir job database, blob root and in-memory queue
//! - Fakes for the completion service and blob storage
//! - A builder for small in-memory PDF documents

pub mod builders;
pub mod fakes;
pub mod harness;

pub use builders::*;
pub use fakes::*;
pub use harness::TestHarness;
