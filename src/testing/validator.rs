//! Structural validation of test definitions
//!
//! A definition earns one point per satisfied check and is valid when its
//! score reaches the threshold for its assertion kind. Assertions that only
//! look at the actual value need fewer points, since the expected-value
//! checks cannot contribute meaningfully for them.

use std::collections::{BTreeSet, HashMap};

use super::assertion::AssertionKind;
use super::config::TestRecord;
use crate::common::Result;
use crate::host::FunctionCatalog;

/// Score needed by assertions that compare against an expected value
pub const STANDARD_THRESHOLD: u32 = 6;

/// Score needed by assertions that only inspect the actual value
pub const ACTUAL_ONLY_THRESHOLD: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Check {
    HasAction,
    ModuleExists,
    FunctionExists,
    KnownAssertion,
    HasExpectedKey,
    HasExpectedValue,
}

const CHECKS: [(Check, u32); 6] = [
    (Check::HasAction, 1),
    (Check::ModuleExists, 1),
    (Check::FunctionExists, 1),
    (Check::KnownAssertion, 1),
    (Check::HasExpectedKey, 1),
    (Check::HasExpectedValue, 1),
];

/// Threshold for a definition's assertion name
///
/// Unrecognized names get the standard threshold.
pub fn required_score(assertion: Option<&str>) -> u32 {
    match assertion.and_then(|a| a.parse::<AssertionKind>().ok()) {
        Some(kind) if !kind.uses_expected() => ACTUAL_ONLY_THRESHOLD,
        _ => STANDARD_THRESHOLD,
    }
}

/// Scores test definitions, remembering module and function lookups
///
/// Lookups are cached for the lifetime of the validator. Create a new one per
/// run so that changes on the minion are picked up.
#[derive(Debug, Default)]
pub struct Validator {
    modules: Option<BTreeSet<String>>,
    functions: HashMap<String, BTreeSet<String>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the definition is complete enough to execute
    pub fn is_valid<C: FunctionCatalog + ?Sized>(
        &mut self,
        catalog: &C,
        record: &TestRecord,
    ) -> Result<bool> {
        let score = self.score(catalog, record)?;
        let required = required_score(record.assertion());
        tracing::debug!(score, required, "test score");
        Ok(score >= required)
    }

    pub fn score<C: FunctionCatalog + ?Sized>(
        &mut self,
        catalog: &C,
        record: &TestRecord,
    ) -> Result<u32> {
        let action = record.module_and_function().map(|mf| match mf.split_once('.') {
            Some((module, function)) => (module, function),
            None => (mf, ""),
        });

        let mut total = 0;
        for (check, weight) in CHECKS {
            let passed = match check {
                Check::HasAction => action.is_some(),
                Check::ModuleExists => match action {
                    Some((module, _)) => self.module_exists(catalog, module)?,
                    None => false,
                },
                Check::FunctionExists => match action {
                    Some((module, function)) => self.function_exists(catalog, module, function),
                    None => false,
                },
                Check::KnownAssertion => record
                    .assertion()
                    .is_some_and(|a| a.parse::<AssertionKind>().is_ok()),
                Check::HasExpectedKey => record.has_expected_key(),
                Check::HasExpectedValue => record.expected().is_some(),
            };
            if passed {
                total += weight;
            }
        }
        Ok(total)
    }

    fn module_exists<C: FunctionCatalog + ?Sized>(
        &mut self,
        catalog: &C,
        module: &str,
    ) -> Result<bool> {
        if self.modules.is_none() {
            self.modules = Some(catalog.list_modules()?);
        }
        Ok(self
            .modules
            .as_ref()
            .is_some_and(|modules| modules.contains(module)))
    }

    /// A failed lookup counts as "function not found"
    fn function_exists<C: FunctionCatalog + ?Sized>(
        &mut self,
        catalog: &C,
        module: &str,
        function: &str,
    ) -> bool {
        if function.is_empty() {
            return false;
        }
        let functions = self.functions.entry(module.to_string()).or_insert_with(|| {
            catalog.list_functions(module).unwrap_or_else(|e| {
                tracing::warn!(module, error = %e, "Unable to look up functions");
                BTreeSet::new()
            })
        });
        functions.contains(&format!("{module}.{function}"))
    }
}
