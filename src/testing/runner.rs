//! Test execution
//!
//! Runs tests against a minion and aggregates the results. Everything runs
//! sequentially: one state at a time, one test at a time.

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::assertion::evaluate;
use super::config::{SpecError, TestRecord, TestSpec, TestSuite};
use super::loader::TestFileLoader;
use super::locator::TestFileLocator;
use super::report::{RunReport, StateReport, TestResult};
use super::scope::StateScopeResolver;
use super::validator::Validator;
use crate::common::config::{Config, MergePolicy};
use crate::common::{Error, Result};
use crate::host::Minion;

/// Listing entry for a state that has no test files
pub const NO_TESTS_FOUND: &str = "[NO TESTS FOUND]";

/// Engine settings taken from the configuration file
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub search_roots: Vec<PathBuf>,
    pub dir_name: String,
    pub extension: String,
    pub merge: MergePolicy,
    pub auto_update_master_cache: bool,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            search_roots: config.search_roots(),
            dir_name: config.tests.dir_name.clone(),
            extension: config.tests.extension.clone(),
            merge: config.tests.merge,
            auto_update_master_cache: config.tests.auto_update_master_cache,
        }
    }
}

/// The test engine for one minion
///
/// Module and function lookups made while validating are cached for the
/// lifetime of the engine; build a new engine for each run.
pub struct SaltCheck<M: Minion> {
    minion: M,
    settings: EngineSettings,
    validator: Validator,
}

impl<M: Minion> SaltCheck<M> {
    pub fn new(minion: M, settings: EngineSettings) -> Result<Self> {
        let engine = Self {
            minion,
            settings,
            validator: Validator::new(),
        };
        if engine.settings.auto_update_master_cache {
            engine.update_master_cache()?;
        }
        Ok(engine)
    }

    pub fn minion(&self) -> &M {
        &self.minion
    }

    /// Copy all master files into the minion cache
    pub fn update_master_cache(&self) -> Result<()> {
        tracing::info!("Updating master cache");
        self.minion.cache_master()
    }

    /// Validate and run a single test definition
    ///
    /// Test outcomes are returned as data. Only a failure to reach the minion
    /// is an error; a definition the minion backend refuses to send is
    /// reported as invalid.
    pub fn run_single_test(&mut self, name: &str, record: &TestRecord) -> Result<TestResult> {
        if !self.validator.is_valid(&self.minion, record)? {
            tracing::info!(test = name, "invalid test");
            return Ok(TestResult::invalid());
        }

        let spec = match TestSpec::from_record(name, record) {
            Ok(spec) => spec,
            Err(SpecError::UnknownAssertion(assertion)) => {
                tracing::warn!(test = name, assertion = %assertion, "unrecognized assertion");
                return Ok(TestResult::bad_assertion());
            }
            Err(SpecError::BadKwargs) => {
                return Ok(TestResult::Invalid("kwargs must be a mapping".to_string()))
            }
            Err(SpecError::MissingAction) => return Ok(TestResult::invalid()),
        };

        let actual = match self.minion.invoke(&spec.action, &spec.args, &spec.kwargs) {
            Ok(actual) => actual,
            Err(Error::InvalidDefinition(reason)) => {
                tracing::info!(test = name, %reason, "test cannot be sent to the minion");
                return Ok(TestResult::Invalid(reason));
            }
            Err(e) => return Err(e),
        };
        let result = evaluate(spec.assertion, spec.expected.as_ref(), &actual);
        tracing::debug!(test = name, %result, "test finished");
        Ok(result)
    }

    /// Run the tests of a state and every state it includes
    pub fn run_state_tests(&mut self, state: &str) -> Result<RunReport> {
        self.run_scope(Some(state))
    }

    /// Run the tests of every state in the highstate
    pub fn run_topology_tests(&mut self) -> Result<RunReport> {
        self.run_scope(None)
    }

    fn run_scope(&mut self, scope: Option<&str>) -> Result<RunReport> {
        let resolution = StateScopeResolver::new(&self.minion).resolve(scope)?;

        let mut suites = Vec::with_capacity(resolution.states.len() + resolution.unresolved.len());
        for state in &resolution.states {
            suites.push((state.clone(), self.load_suite(state)?));
        }
        // Unresolved states have nothing to run and count as missing tests
        suites.extend(
            resolution
                .unresolved
                .iter()
                .map(|state| (state.clone(), TestSuite::new())),
        );

        let report = self.aggregate(&suites)?;
        tracing::info!(
            passed = report.summary.passed,
            failed = report.summary.failed,
            missing = report.summary.missing_tests,
            "run finished"
        );
        Ok(report)
    }

    /// Run already loaded suites and build a report
    ///
    /// States are reported in identifier order whatever the input order. An
    /// empty suite counts as missing tests.
    pub fn aggregate(&mut self, suites: &[(String, TestSuite)]) -> Result<RunReport> {
        let mut reports = Vec::with_capacity(suites.len());
        for (state, suite) in suites {
            reports.push(self.run_suite(state, suite)?);
        }
        Ok(RunReport::new(reports))
    }

    fn run_suite(&mut self, state: &str, suite: &TestSuite) -> Result<StateReport> {
        if suite.is_empty() {
            tracing::info!(state, "no tests found");
        }
        let mut report = StateReport::new(state);
        for (name, record) in suite.iter() {
            let result = self.run_single_test(name, record)?;
            report.results.push((name.to_string(), result));
        }
        Ok(report)
    }

    /// Discover and load the test suite of one state
    pub fn load_suite(&self, state: &str) -> Result<TestSuite> {
        let paths = self.locator().locate(state)?;
        TestFileLoader::new(&self.minion, self.settings.merge).load(&paths)
    }

    /// Test files per state, relative to the state's directory
    ///
    /// Nothing is executed. States without tests list [`NO_TESTS_FOUND`].
    pub fn list_tests(&self, state: Option<&str>) -> Result<BTreeMap<String, Vec<String>>> {
        let resolution = StateScopeResolver::new(&self.minion).resolve(state)?;
        let locator = self.locator();

        let mut listing = BTreeMap::new();
        for state in resolution.all() {
            let files = if resolution.unresolved.iter().any(|s| s == state) {
                Vec::new()
            } else {
                locator.locate_files(state)?
            };
            let mut names: Vec<String> = files
                .iter()
                .map(|f| f.relative.display().to_string())
                .collect();
            if names.is_empty() {
                names.push(NO_TESTS_FOUND.to_string());
            }
            listing.insert(state.to_string(), names);
        }
        Ok(listing)
    }

    fn locator(&self) -> TestFileLocator<'_, M> {
        TestFileLocator::new(
            &self.minion,
            self.settings.search_roots.clone(),
            &self.settings.dir_name,
            &self.settings.extension,
        )
    }
}
