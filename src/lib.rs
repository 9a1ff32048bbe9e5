//! Backend scenarios - API scenario harness
//!
//! This library drives ordered, failure-isolated scenarios against a running
//! backend over HTTP and reduces them to a pass/fail/warn ledger.

pub mod cli;
pub mod commands;
pub mod common;
pub mod harness;
pub mod suites;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use harness::{Harness, Ledger, Outcome, Summary};
