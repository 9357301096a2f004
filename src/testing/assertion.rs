//! Assertion kinds and their evaluation
//!
//! Expected values come from hand-written test files, so before an
//! equality or ordering comparison the expected value is first coerced into
//! the kind of value the action actually returned.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::report::TestResult;
use super::value::{self, display};

/// The fixed vocabulary of assertions a test may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssertionKind {
    #[serde(rename = "assertEqual")]
    Equal,
    #[serde(rename = "assertNotEqual")]
    NotEqual,
    #[serde(rename = "assertTrue")]
    True,
    #[serde(rename = "assertFalse")]
    False,
    #[serde(rename = "assertIn")]
    In,
    #[serde(rename = "assertNotIn")]
    NotIn,
    #[serde(rename = "assertGreater")]
    Greater,
    #[serde(rename = "assertGreaterEqual")]
    GreaterEqual,
    #[serde(rename = "assertLess")]
    Less,
    #[serde(rename = "assertLessEqual")]
    LessEqual,
    #[serde(rename = "assertEmpty")]
    Empty,
    #[serde(rename = "assertNotEmpty")]
    NotEmpty,
}

impl AssertionKind {
    pub const ALL: [AssertionKind; 12] = [
        AssertionKind::Equal,
        AssertionKind::NotEqual,
        AssertionKind::True,
        AssertionKind::False,
        AssertionKind::In,
        AssertionKind::NotIn,
        AssertionKind::Greater,
        AssertionKind::GreaterEqual,
        AssertionKind::Less,
        AssertionKind::LessEqual,
        AssertionKind::Empty,
        AssertionKind::NotEmpty,
    ];

    /// Name as written in test files
    pub fn name(self) -> &'static str {
        match self {
            AssertionKind::Equal => "assertEqual",
            AssertionKind::NotEqual => "assertNotEqual",
            AssertionKind::True => "assertTrue",
            AssertionKind::False => "assertFalse",
            AssertionKind::In => "assertIn",
            AssertionKind::NotIn => "assertNotIn",
            AssertionKind::Greater => "assertGreater",
            AssertionKind::GreaterEqual => "assertGreaterEqual",
            AssertionKind::Less => "assertLess",
            AssertionKind::LessEqual => "assertLessEqual",
            AssertionKind::Empty => "assertEmpty",
            AssertionKind::NotEmpty => "assertNotEmpty",
        }
    }

    /// Whether the assertion compares against an expected value at all
    pub fn uses_expected(self) -> bool {
        !matches!(
            self,
            AssertionKind::True | AssertionKind::False | AssertionKind::Empty | AssertionKind::NotEmpty
        )
    }

    /// Whether the expected value is coerced to the actual value's kind first
    pub fn coerces_expected(self) -> bool {
        matches!(
            self,
            AssertionKind::Equal
                | AssertionKind::NotEqual
                | AssertionKind::Greater
                | AssertionKind::GreaterEqual
                | AssertionKind::Less
                | AssertionKind::LessEqual
        )
    }
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognized assertion name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAssertion(pub String);

impl FromStr for AssertionKind {
    type Err = UnknownAssertion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssertionKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownAssertion(s.to_string()))
    }
}

/// Coerce `expected` into the kind of value `actual` is
///
/// When the coercion is not possible `expected` is returned unchanged and
/// the comparison that follows decides the outcome.
pub fn coerce_expected(expected: &Value, actual: &Value) -> Value {
    let coerced = match actual {
        Value::Bool(_) => Some(to_bool(expected)),
        Value::Number(n) if n.is_f64() => to_float(expected),
        Value::Number(_) => to_int(expected),
        Value::String(_) => Some(Value::String(display(expected))),
        Value::Array(_) => to_list(expected),
        Value::Object(_) => expected.is_object().then(|| expected.clone()),
        Value::Null => None,
    };
    coerced.unwrap_or_else(|| {
        tracing::debug!(
            expected = %expected,
            actual = %actual,
            "Unable to cast expected into type of returned"
        );
        expected.clone()
    })
}

fn to_bool(expected: &Value) -> Value {
    // Plain truthiness would turn the text "False" into true.
    if expected.as_str() == Some("False") {
        return Value::Bool(false);
    }
    Value::Bool(value::is_truthy(expected))
}

fn to_int(expected: &Value) -> Option<Value> {
    match expected {
        Value::Bool(b) => Some(Value::from(i64::from(*b))),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => float_to_int(f),
            _ => Some(expected.clone()),
        },
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(Value::from)
                .or_else(|_| s.parse::<u64>().map(Value::from))
                .ok()
        }
        _ => None,
    }
}

/// Truncate toward zero, or `None` when the result fits neither i64 nor u64
fn float_to_int(f: f64) -> Option<Value> {
    let whole = f.trunc();
    let i64_bound = 2f64.powi(63);
    if whole >= -i64_bound && whole < i64_bound {
        Some(Value::from(whole as i64))
    } else if whole >= 0.0 && whole < 2f64.powi(64) {
        Some(Value::from(whole as u64))
    } else {
        None
    }
}

fn to_float(expected: &Value) -> Option<Value> {
    let f = match expected {
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    serde_json::Number::from_f64(f).map(Value::Number)
}

fn to_list(expected: &Value) -> Option<Value> {
    match expected {
        Value::Array(_) => Some(expected.clone()),
        Value::String(s) => Some(Value::Array(
            s.chars().map(|c| Value::String(c.to_string())).collect(),
        )),
        Value::Object(map) => Some(Value::Array(
            map.keys().cloned().map(Value::String).collect(),
        )),
        _ => None,
    }
}

/// Evaluate one assertion against an action's return value
///
/// Never fails: comparisons that cannot be made produce a `Fail` result.
pub fn evaluate(kind: AssertionKind, expected: Option<&Value>, actual: &Value) -> TestResult {
    let expected = expected.cloned().unwrap_or(Value::Null);
    let expected = if kind.coerces_expected() {
        coerce_expected(&expected, actual)
    } else {
        expected
    };
    let (e, a) = (&expected, actual);

    match kind {
        AssertionKind::Equal => check(value::loose_eq(e, a), || {
            format!("{} is not equal to {}", display(e), display(a))
        }),
        AssertionKind::NotEqual => check(!value::loose_eq(e, a), || {
            format!("{} is equal to {}", display(e), display(a))
        }),
        AssertionKind::True => check(*a == Value::Bool(true), || format!("{} not True", display(a))),
        AssertionKind::False => {
            let a = match a {
                Value::String(s) => Value::Bool(!s.is_empty()),
                other => other.clone(),
            };
            check(a == Value::Bool(false), || format!("{} not False", display(&a)))
        }
        AssertionKind::In => match value::contains(a, e) {
            Some(found) => check(found, || format!("{} not in {}", display(e), display(a))),
            None => membership_error(e, a),
        },
        AssertionKind::NotIn => match value::contains(a, e) {
            Some(found) => check(!found, || format!("{} is in {}", display(e), display(a))),
            None => membership_error(e, a),
        },
        AssertionKind::Greater => ordered(e, a, "greater than", |o| o == Ordering::Greater),
        AssertionKind::GreaterEqual => {
            ordered(e, a, "greater than or equal to", |o| o != Ordering::Less)
        }
        AssertionKind::Less => ordered(e, a, "less than", |o| o == Ordering::Less),
        AssertionKind::LessEqual => {
            ordered(e, a, "less than or equal to", |o| o != Ordering::Greater)
        }
        AssertionKind::Empty => check(!value::is_truthy(a), || format!("{} is not empty", display(a))),
        AssertionKind::NotEmpty => check(value::is_truthy(a), || format!("{} is empty", display(a))),
    }
}

fn check(holds: bool, message: impl FnOnce() -> String) -> TestResult {
    if holds {
        TestResult::Pass
    } else {
        TestResult::Fail(message())
    }
}

fn ordered(
    expected: &Value,
    actual: &Value,
    relation: &str,
    accept: impl FnOnce(Ordering) -> bool,
) -> TestResult {
    match value::compare(expected, actual) {
        Some(ordering) => check(accept(ordering), || {
            format!("{} not {} {}", display(expected), relation, display(actual))
        }),
        None => TestResult::Fail(format!(
            "cannot compare {} with {}",
            display(expected),
            display(actual)
        )),
    }
}

fn membership_error(expected: &Value, actual: &Value) -> TestResult {
    TestResult::Fail(format!(
        "cannot test membership of {} in {}",
        display(expected),
        display(actual)
    ))
}
