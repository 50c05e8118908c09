//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! ledger test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built ledgers with a standard chart of entry types
//! - `builders`: Builder helpers for invoices and entry timelines
//! - `generators`: Property-based test data generators

pub mod builders;
pub mod fixtures;
pub mod generators;

pub use builders::*;
pub use fixtures::*;
pub use generators::*;
