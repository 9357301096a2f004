//! State test engine
//!
//! Discovers the test files that belong to a set of salt states, validates
//! each test, runs its function on the minion and checks the result with one
//! of a fixed set of assertions.

mod assertion;
mod config;
mod loader;
mod locator;
mod report;
mod runner;
mod scope;
mod validator;
mod value;

pub use assertion::{coerce_expected, evaluate, AssertionKind, UnknownAssertion};
pub use config::*;
pub use loader::TestFileLoader;
pub use locator::{TestFile, TestFileLocator};
pub use report::{RunReport, StateReport, Summary, TestResult};
pub use runner::{EngineSettings, SaltCheck, NO_TESTS_FOUND};
pub use scope::{Resolution, StateScopeResolver};
pub use validator::{required_score, Validator, ACTUAL_ONLY_THRESHOLD, STANDARD_THRESHOLD};
