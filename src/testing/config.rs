//! Test definition types
//!
//! A test file maps unique test ids to records:
//!
//! ```yaml
//! echo-test-hello:
//!   module_and_function: test.echo
//!   args:
//!     - "hello"
//!   kwargs:
//!   assertion: assertEqual
//!   expected-return: 'hello'
//! ```
//!
//! Records are kept as raw mappings until they pass validation, because the
//! validator needs to tell a missing key apart from a key set to null.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

use super::assertion::{AssertionKind, UnknownAssertion};
use crate::common::config::MergePolicy;
use crate::common::{Error, Result};

pub const KEY_MODULE_AND_FUNCTION: &str = "module_and_function";
pub const KEY_ARGS: &str = "args";
pub const KEY_KWARGS: &str = "kwargs";
pub const KEY_PILLAR_DATA: &str = "pillar-data";
pub const KEY_ASSERTION: &str = "assertion";
pub const KEY_EXPECTED_RETURN: &str = "expected-return";

/// Keyword argument that carries `pillar-data`
const PILLAR_KWARG: &str = "pillar";

/// One test definition as written in a test file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TestRecord(Map<String, Value>);

impl TestRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Accepts only a mapping
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// The `module.function` to call, when present and non-empty
    pub fn module_and_function(&self) -> Option<&str> {
        self.0
            .get(KEY_MODULE_AND_FUNCTION)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn assertion(&self) -> Option<&str> {
        self.0.get(KEY_ASSERTION).and_then(Value::as_str)
    }

    /// Whether `expected-return` is written at all, even empty
    pub fn has_expected_key(&self) -> bool {
        self.0.contains_key(KEY_EXPECTED_RETURN)
    }

    /// The expected value, unless absent or null
    pub fn expected(&self) -> Option<&Value> {
        self.0.get(KEY_EXPECTED_RETURN).filter(|v| !v.is_null())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Why a validated record still could not become a [`TestSpec`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    MissingAction,
    UnknownAssertion(String),
    BadKwargs,
}

impl From<UnknownAssertion> for SpecError {
    fn from(e: UnknownAssertion) -> Self {
        SpecError::UnknownAssertion(e.0)
    }
}

/// A parsed, executable test
#[derive(Debug, Clone, PartialEq)]
pub struct TestSpec {
    pub name: String,
    /// `module.function`
    pub action: String,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
    pub assertion: AssertionKind,
    pub expected: Option<Value>,
}

impl TestSpec {
    pub fn from_record(name: &str, record: &TestRecord) -> std::result::Result<Self, SpecError> {
        let action = record
            .module_and_function()
            .ok_or(SpecError::MissingAction)?
            .to_string();
        let assertion = record.assertion().unwrap_or_default().parse::<AssertionKind>()?;

        Ok(Self {
            name: name.to_string(),
            action,
            args: parse_args(record.get(KEY_ARGS)),
            kwargs: parse_kwargs(record.get(KEY_KWARGS), record.get(KEY_PILLAR_DATA))?,
            assertion,
            expected: record.expected().cloned(),
        })
    }
}

/// `args` may be a list, a space separated string, or a single value
fn parse_args(args: Option<&Value>) -> Vec<Value> {
    match args {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(s)) => s
            .split_whitespace()
            .map(|part| Value::String(part.to_string()))
            .collect(),
        Some(other) => vec![other.clone()],
    }
}

fn parse_kwargs(
    kwargs: Option<&Value>,
    pillar: Option<&Value>,
) -> std::result::Result<Map<String, Value>, SpecError> {
    let mut parsed = match kwargs {
        None | Some(Value::Null) => Map::new(),
        Some(Value::String(s)) if s.trim().is_empty() => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return Err(SpecError::BadKwargs),
    };
    if let Some(pillar) = pillar.filter(|p| value_is_set(p)) {
        parsed.insert(PILLAR_KWARG.to_string(), pillar.clone());
    }
    Ok(parsed)
}

fn value_is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

/// Named tests for one state, merged from one or more files
///
/// Replacing a test keeps the position of its first definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestSuite {
    tests: Vec<(String, TestRecord)>,
    /// Position of each name in `tests`
    index: HashMap<String, usize>,
}

impl TestSuite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a test, returning the definition it replaced
    pub fn insert(&mut self, name: String, record: TestRecord) -> Option<TestRecord> {
        match self.index.get(&name) {
            Some(&position) => Some(std::mem::replace(&mut self.tests[position].1, record)),
            None => {
                self.index.insert(name.clone(), self.tests.len());
                self.tests.push((name, record));
                None
            }
        }
    }

    /// Insert a test loaded from `path`, honouring the merge policy
    pub fn merge(
        &mut self,
        name: String,
        record: TestRecord,
        path: &Path,
        policy: MergePolicy,
    ) -> Result<()> {
        if policy == MergePolicy::Strict && self.get(&name).is_some() {
            return Err(Error::DuplicateTest {
                name,
                path: path.to_path_buf(),
            });
        }
        if self.insert(name.clone(), record).is_some() {
            tracing::debug!(test = %name, file = %path.display(), "Test replaced by later file");
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TestRecord> {
        self.index.get(name).map(|&position| &self.tests[position].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TestRecord)> {
        self.tests.iter().map(|(name, record)| (name.as_str(), record))
    }

    pub fn names(&self) -> Vec<&str> {
        self.tests.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}
