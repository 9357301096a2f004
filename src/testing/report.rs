//! Test results and run reports

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Prefix shared by every failing outcome
const FAIL_MARKER: &str = "Fail";

/// Outcome of a single test
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestResult {
    /// The assertion held
    Pass,
    /// The assertion did not hold, or the assertion kind was not recognized
    Fail(String),
    /// The test definition is structurally incomplete and was not executed
    Invalid(String),
}

impl TestResult {
    /// Result for a definition that did not reach its validation threshold
    pub fn invalid() -> Self {
        Self::Invalid("invalid test".to_string())
    }

    /// Result for an assertion kind that is not recognized at execution time
    pub fn bad_assertion() -> Self {
        Self::Fail("bad assertion".to_string())
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// `Fail` and `Invalid` both count as failures in the summary
    pub fn is_failure(&self) -> bool {
        self.to_string().starts_with(FAIL_MARKER)
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "Pass"),
            Self::Fail(message) => write!(f, "{FAIL_MARKER}: {message}"),
            Self::Invalid(reason) => write!(f, "{FAIL_MARKER} - {reason}"),
        }
    }
}

impl Serialize for TestResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Results for every test of one state, in suite order
#[derive(Debug, Clone, PartialEq)]
pub struct StateReport {
    pub state: String,
    pub results: Vec<(String, TestResult)>,
}

impl StateReport {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            results: Vec::new(),
        }
    }

    pub fn get(&self, test: &str) -> Option<&TestResult> {
        self.results
            .iter()
            .find(|(name, _)| name == test)
            .map(|(_, result)| result)
    }
}

/// Counts over a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    #[serde(rename = "Passed")]
    pub passed: usize,
    #[serde(rename = "Failed")]
    pub failed: usize,
    /// States that resolved to no tests at all
    #[serde(rename = "Missing Tests")]
    pub missing_tests: usize,
}

impl Summary {
    fn tally(states: &[StateReport]) -> Self {
        let mut summary = Self::default();
        for state in states {
            if state.results.is_empty() {
                summary.missing_tests += 1;
                continue;
            }
            for (_, result) in &state.results {
                if result.is_pass() {
                    summary.passed += 1;
                } else if result.is_failure() {
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

/// Per-state results ordered by state identifier, plus a summary
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub states: Vec<StateReport>,
    pub summary: Summary,
}

impl RunReport {
    /// Build a report from per-state results in any order
    pub fn new(mut states: Vec<StateReport>) -> Self {
        states.sort_by(|a, b| a.state.cmp(&b.state));
        let summary = Summary::tally(&states);
        Self { states, summary }
    }

    pub fn state(&self, state: &str) -> Option<&StateReport> {
        self.states.iter().find(|s| s.state == state)
    }

    pub fn all_passed(&self) -> bool {
        self.summary.failed == 0
    }
}

/// Serializes one state as `{state: {test: result, ...}}`
struct StateEntry<'a>(&'a StateReport);

impl Serialize for StateEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Tests<'a>(&'a [(String, TestResult)]);

        impl Serialize for Tests<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (name, result) in self.0 {
                    map.serialize_entry(name, result)?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.0.state, &Tests(&self.0.results))?;
        map.end()
    }
}

impl Serialize for RunReport {
    /// A list of one-key state objects followed by `{"TEST RESULTS": summary}`
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.states.len() + 1))?;
        for state in &self.states {
            seq.serialize_element(&StateEntry(state))?;
        }
        let mut trailer = BTreeMap::new();
        trailer.insert("TEST RESULTS", self.summary);
        seq.serialize_element(&trailer)?;
        seq.end()
    }
}
