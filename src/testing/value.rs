//! Loose comparison semantics for dynamic values
//!
//! Action results come back as untyped JSON while expectations are written
//! by hand in YAML, so equality and ordering here are deliberately forgiving:
//! booleans and numbers share one numeric domain, sequences compare
//! element-wise, and anything else only equals its own kind.

use serde_json::Value;
use std::cmp::Ordering;

/// A numeric view of a value; booleans count as 0 and 1
#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i128),
    Float(f64),
}

fn numeric(value: &Value) -> Option<Numeric> {
    match value {
        Value::Bool(b) => Some(Numeric::Int(i128::from(*b))),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Numeric::Int(i128::from(i)))
            } else if let Some(u) = n.as_u64() {
                Some(Numeric::Int(i128::from(u)))
            } else {
                n.as_f64().map(Numeric::Float)
            }
        }
        _ => None,
    }
}

fn compare_numeric(a: Numeric, b: Numeric) -> Option<Ordering> {
    match (a, b) {
        (Numeric::Int(x), Numeric::Int(y)) => Some(x.cmp(&y)),
        (Numeric::Int(x), Numeric::Float(y)) => compare_int_float(x, y),
        (Numeric::Float(x), Numeric::Int(y)) => compare_int_float(y, x).map(Ordering::reverse),
        (Numeric::Float(x), Numeric::Float(y)) => x.partial_cmp(&y),
    }
}

/// Exact comparison of an integer with a float
///
/// The float's integer part is compared as an integer, its fraction breaks
/// ties. Casting the integer to f64 instead would round above 2^53.
fn compare_int_float(int: i128, float: f64) -> Option<Ordering> {
    if float.is_nan() {
        return None;
    }
    // 2^127, the first magnitude outside i128
    let bound = 2f64.powi(127);
    let whole = float.trunc();
    if whole >= bound {
        return Some(Ordering::Less);
    }
    if whole < -bound {
        return Some(Ordering::Greater);
    }

    match int.cmp(&(whole as i128)) {
        Ordering::Equal => 0f64.partial_cmp(&(float - whole)),
        other => Some(other),
    }
}

/// Render a value the way it appears in result messages
///
/// Strings are shown without quotes, booleans as `True`/`False`,
/// null as `None`, collections as compact JSON.
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

/// Whether a value counts as "non-empty"
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(_) => match numeric(value) {
            Some(Numeric::Int(i)) => i != 0,
            Some(Numeric::Float(f)) => f != 0.0,
            None => false,
        },
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Structural equality with numeric widening
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (numeric(a), numeric(b)) {
        return compare_numeric(x, y) == Some(Ordering::Equal);
    }
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| loose_eq(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| loose_eq(v, other)))
        }
        _ => false,
    }
}

/// Order two values, or `None` when they cannot be ordered
///
/// Sequences are ordered by their first differing element, then by length.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (numeric(a), numeric(b)) {
        return compare_numeric(x, y);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                if !loose_eq(l, r) {
                    return compare(l, r);
                }
            }
            Some(x.len().cmp(&y.len()))
        }
        _ => None,
    }
}

/// Membership test of `item` in `container`
///
/// Text supports substring search for text items, sequences search their
/// elements, mappings search their keys. `None` means the container does not
/// support membership for this item.
pub fn contains(container: &Value, item: &Value) -> Option<bool> {
    match container {
        Value::String(haystack) => match item {
            Value::String(needle) => Some(haystack.contains(needle.as_str())),
            _ => None,
        },
        Value::Array(items) => Some(items.iter().any(|v| loose_eq(v, item))),
        Value::Object(map) => match item {
            Value::String(key) => Some(map.contains_key(key)),
            Value::Array(_) | Value::Object(_) => None,
            _ => Some(false),
        },
        _ => None,
    }
}
