//! Single-event filter evaluation.
//!
//! The temporal matchers never look inside a filter; they only ask
//! [`EventFilter::matches`]. [`CompiledFilter`] is the evaluator shipped with
//! the crate: a [`FilterSpec`] compiled once (regexes built, operands
//! normalized) and evaluated per event without allocation.
//!
//! An event that cannot be evaluated (missing field, incompatible type) is a
//! non-match, never an error.

use regex::Regex;
use serde_json::Value;

use rtempo_spec::{FieldOp, FilterSpec, FilterValue};

use crate::error::{EvalError, Result};
use crate::event::Event;

/// Anything that can decide whether one event matches.
///
/// Plain functions `fn(&Event) -> bool` implement this too, which keeps
/// matcher tests independent of the filter language.
pub trait EventFilter {
    fn matches(&self, event: &Event<'_>) -> bool;
}

impl<F> EventFilter for F
where
    F: Fn(&Event<'_>) -> bool,
{
    fn matches(&self, event: &Event<'_>) -> bool {
        self(event)
    }
}

// =============================================================================
// Compiled filter tree
// =============================================================================

/// A compiled predicate tree.
#[derive(Debug, Clone)]
pub enum CompiledFilter {
    All(Vec<CompiledFilter>),
    Any(Vec<CompiledFilter>),
    Not(Box<CompiledFilter>),
    Field { field: String, matcher: ValueMatcher },
    Exists { field: String, expected: bool },
}

/// Ordering comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    fn holds(self, ord: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CompareOp::Gt => ord == Greater,
            CompareOp::Gte => ord != Less,
            CompareOp::Lt => ord == Less,
            CompareOp::Lte => ord != Greater,
        }
    }
}

/// Right-hand side of an ordering comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparable {
    Number(f64),
    /// Lexicographic comparison (e.g. ISO 8601 timestamps).
    Text(String),
}

/// A pre-compiled comparison against one field value.
#[derive(Debug, Clone)]
pub enum ValueMatcher {
    Equals(FilterValue),
    NotEquals(FilterValue),
    Compare { op: CompareOp, operand: Comparable },
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    Regex(Regex),
}

impl CompiledFilter {
    pub fn matches(&self, event: &Event<'_>) -> bool {
        match self {
            CompiledFilter::All(children) => children.iter().all(|c| c.matches(event)),
            CompiledFilter::Any(children) => children.iter().any(|c| c.matches(event)),
            CompiledFilter::Not(inner) => !inner.matches(event),
            CompiledFilter::Exists { field, expected } => event.has_field(field) == *expected,
            CompiledFilter::Field { field, matcher } => match event.get_field(field) {
                Some(value) => matcher.matches(value),
                None => false,
            },
        }
    }
}

impl EventFilter for CompiledFilter {
    fn matches(&self, event: &Event<'_>) -> bool {
        CompiledFilter::matches(self, event)
    }
}

impl ValueMatcher {
    /// Check a present field value. Arrays match if any element matches,
    /// except for `NotEquals`, which requires that no element equals.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueMatcher::Equals(expected) => value_equals(value, expected),
            ValueMatcher::NotEquals(expected) => !value_equals(value, expected),
            ValueMatcher::Compare { op, operand } => match_compare(value, *op, operand),
            ValueMatcher::Contains(needle) => match_str(value, &|s| s.contains(needle.as_str())),
            ValueMatcher::StartsWith(prefix) => {
                match_str(value, &|s| s.starts_with(prefix.as_str()))
            }
            ValueMatcher::EndsWith(suffix) => match_str(value, &|s| s.ends_with(suffix.as_str())),
            ValueMatcher::Regex(re) => match_str(value, &|s| re.is_match(s)),
        }
    }
}

// =============================================================================
// Compilation
// =============================================================================

/// Compile a filter specification.
///
/// Fails with [`EvalError::InvalidSpec`] on operands that cannot work with
/// their operator (an unparseable regex, ordering against `null`, ...).
pub fn compile_filter(spec: &FilterSpec) -> Result<CompiledFilter> {
    Ok(match spec {
        FilterSpec::All(children) => CompiledFilter::All(compile_children(children)?),
        FilterSpec::Any(children) => CompiledFilter::Any(compile_children(children)?),
        FilterSpec::Not(inner) => CompiledFilter::Not(Box::new(compile_filter(inner)?)),
        FilterSpec::Exists { field, expected } => CompiledFilter::Exists {
            field: field.clone(),
            expected: *expected,
        },
        FilterSpec::Field { field, op, value } => CompiledFilter::Field {
            field: field.clone(),
            matcher: compile_matcher(field, *op, value)?,
        },
    })
}

fn compile_children(children: &[FilterSpec]) -> Result<Vec<CompiledFilter>> {
    children.iter().map(compile_filter).collect()
}

fn compile_matcher(field: &str, op: FieldOp, value: &FilterValue) -> Result<ValueMatcher> {
    let compare = |op: CompareOp| -> Result<ValueMatcher> {
        let operand = match value {
            FilterValue::Integer(i) => Comparable::Number(*i as f64),
            FilterValue::Number(n) => Comparable::Number(*n),
            FilterValue::String(s) => match s.parse::<f64>() {
                Ok(n) => Comparable::Number(n),
                Err(_) => Comparable::Text(s.clone()),
            },
            other => {
                return Err(EvalError::InvalidSpec(format!(
                    "field '{field}': cannot order against {other}"
                )));
            }
        };
        Ok(ValueMatcher::Compare { op, operand })
    };

    let text = || -> Result<String> {
        match value {
            FilterValue::String(s) => Ok(s.clone()),
            FilterValue::Integer(i) => Ok(i.to_string()),
            FilterValue::Number(n) => Ok(n.to_string()),
            FilterValue::Bool(b) => Ok(b.to_string()),
            FilterValue::Null => Err(EvalError::InvalidSpec(format!(
                "field '{field}': '{}' needs a string operand",
                op.as_str()
            ))),
        }
    };

    Ok(match op {
        FieldOp::Eq => ValueMatcher::Equals(value.clone()),
        FieldOp::Ne => ValueMatcher::NotEquals(value.clone()),
        FieldOp::Gt => compare(CompareOp::Gt)?,
        FieldOp::Gte => compare(CompareOp::Gte)?,
        FieldOp::Lt => compare(CompareOp::Lt)?,
        FieldOp::Lte => compare(CompareOp::Lte)?,
        FieldOp::Contains => ValueMatcher::Contains(text()?),
        FieldOp::StartsWith => ValueMatcher::StartsWith(text()?),
        FieldOp::EndsWith => ValueMatcher::EndsWith(text()?),
        FieldOp::Regex => {
            let pattern = text()?;
            let re = Regex::new(&pattern).map_err(|e| {
                EvalError::InvalidSpec(format!("field '{field}': invalid regex: {e}"))
            })?;
            ValueMatcher::Regex(re)
        }
    })
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn value_equals(value: &Value, expected: &FilterValue) -> bool {
    if let Value::Array(arr) = value {
        return arr.iter().any(|v| value_equals(v, expected));
    }
    match expected {
        FilterValue::Null => value.is_null(),
        FilterValue::Bool(b) => match value {
            Value::Bool(v) => v == b,
            Value::String(s) => s.eq_ignore_ascii_case(if *b { "true" } else { "false" }),
            _ => false,
        },
        FilterValue::Integer(i) => integer_equals(value, *i),
        FilterValue::Number(n) => value_as_f64(value).is_some_and(|v| (v - n).abs() < f64::EPSILON),
        FilterValue::String(s) => match value {
            Value::String(v) => v == s,
            Value::Number(num) => {
                num.to_string() == *s
                    || s.parse::<f64>()
                        .ok()
                        .zip(num.as_f64())
                        .is_some_and(|(a, b)| (a - b).abs() < f64::EPSILON)
            }
            Value::Bool(v) => s.eq_ignore_ascii_case(if *v { "true" } else { "false" }),
            _ => false,
        },
    }
}

/// Exact integer equality; only non-integral values fall back to `f64`.
fn integer_equals(value: &Value, expected: i64) -> bool {
    match value {
        Value::Number(num) => {
            if let Some(v) = num.as_i64() {
                v == expected
            } else if num.is_u64() {
                // Above i64::MAX, so never equal.
                false
            } else {
                num.as_f64().is_some_and(|v| v == expected as f64)
            }
        }
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(v) => v == expected,
                Err(_) => s.parse::<f64>().is_ok_and(|v| v == expected as f64),
            }
        }
        _ => false,
    }
}

fn match_compare(value: &Value, op: CompareOp, operand: &Comparable) -> bool {
    if let Value::Array(arr) = value {
        return arr.iter().any(|v| match_compare(v, op, operand));
    }
    match operand {
        Comparable::Number(n) => value_as_f64(value)
            .and_then(|v| v.partial_cmp(n))
            .is_some_and(|ord| op.holds(ord)),
        Comparable::Text(t) => match value {
            Value::String(s) => op.holds(s.as_str().cmp(t.as_str())),
            _ => false,
        },
    }
}

fn match_str(value: &Value, pred: &dyn Fn(&str) -> bool) -> bool {
    match value {
        Value::String(s) => pred(s),
        Value::Number(n) => pred(&n.to_string()),
        Value::Bool(b) => pred(if *b { "true" } else { "false" }),
        Value::Array(arr) => arr.iter().any(|v| match_str(v, pred)),
        _ => false,
    }
}

/// Numeric view of a JSON value; numeric strings are parsed.
fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
