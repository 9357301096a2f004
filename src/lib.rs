//! saltcheck - unit-test like checks for salt states
//!
//! Tests are declared in YAML files kept next to the state they verify.
//! Each test names an execution module function, its arguments, an
//! assertion and an expected return value. This library discovers those
//! files for a state or a whole highstate, runs them on the minion and
//! reports the results.

pub mod cli;
pub mod commands;
pub mod common;
pub mod host;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use testing::{AssertionKind, RunReport, SaltCheck, TestResult};
