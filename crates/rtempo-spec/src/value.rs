//! Scalar filter operands and window durations.

use std::fmt;

use serde::Serialize;

use crate::error::{Result, SpecError};

// =============================================================================
// FilterValue — the right-hand side of a field predicate
// =============================================================================

/// A scalar operand compared against an event field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    String(String),
    /// Integral operand, kept exact so 64-bit ids compare correctly.
    Integer(i64),
    Number(f64),
    Bool(bool),
    Null,
}

impl FilterValue {
    /// Convert a YAML scalar into a filter operand.
    ///
    /// Returns `None` for sequences, mappings and tagged values.
    pub fn from_yaml(value: &serde_yaml::Value) -> Option<Self> {
        match value {
            serde_yaml::Value::String(s) => Some(FilterValue::String(s.clone())),
            serde_yaml::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(FilterValue::Integer(i)),
                None => n.as_f64().map(FilterValue::Number),
            },
            serde_yaml::Value::Bool(b) => Some(FilterValue::Bool(*b)),
            serde_yaml::Value::Null => Some(FilterValue::Null),
            _ => None,
        }
    }

    /// Numeric view of the operand; strings are parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FilterValue::Integer(i) => Some(*i as f64),
            FilterValue::Number(n) => Some(*n),
            FilterValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::String(s)
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        FilterValue::Number(n)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Integer(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::String(s) => write!(f, "'{s}'"),
            FilterValue::Integer(i) => write!(f, "{i}"),
            FilterValue::Number(n) => write!(f, "{n}"),
            FilterValue::Bool(b) => write!(f, "{b}"),
            FilterValue::Null => f.write_str("null"),
        }
    }
}

// =============================================================================
// Timespan — window durations like `500ms`, `15s`, `1h`
// =============================================================================

/// A parsed window duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timespan {
    /// Equivalent duration in milliseconds.
    pub millis: u64,
    /// Original string representation.
    pub original: String,
}

impl Timespan {
    /// Parse a duration string like `"500ms"`, `"15s"`, `"30m"`, `"2h"`, `"7d"`.
    ///
    /// A bare integer is taken as milliseconds.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || SpecError::InvalidTimespan(s.to_string());

        let digits_end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (count_str, unit_str) = trimmed.split_at(digits_end);
        if count_str.is_empty() {
            return Err(invalid());
        }
        let count: u64 = count_str.parse().map_err(|_| invalid())?;

        let multiplier = match unit_str {
            "" | "ms" => 1u64,
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            "d" => 86_400_000,
            _ => return Err(invalid()),
        };

        let millis = count.checked_mul(multiplier).ok_or_else(invalid)?;
        Ok(Timespan {
            millis,
            original: s.to_string(),
        })
    }
}

impl fmt::Display for Timespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}
