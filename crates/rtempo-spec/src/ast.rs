//! Strongly-typed pattern and filter specifications.
//!
//! These are the already-validated structured inputs accepted by the
//! temporal engine. They can be built programmatically or loaded from YAML
//! via [`crate::parser`].

use std::fmt;

use serde::Serialize;

use crate::value::FilterValue;

// =============================================================================
// Filters
// =============================================================================

/// Comparison operator of a field predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    StartsWith,
    EndsWith,
    /// Regular expression match.
    Regex,
}

impl FieldOp {
    /// Parse an operator suffix as written after `field|`.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "eq" => FieldOp::Eq,
            "ne" => FieldOp::Ne,
            "gt" => FieldOp::Gt,
            "gte" => FieldOp::Gte,
            "lt" => FieldOp::Lt,
            "lte" => FieldOp::Lte,
            "contains" => FieldOp::Contains,
            "startswith" => FieldOp::StartsWith,
            "endswith" => FieldOp::EndsWith,
            "re" => FieldOp::Regex,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldOp::Eq => "eq",
            FieldOp::Ne => "ne",
            FieldOp::Gt => "gt",
            FieldOp::Gte => "gte",
            FieldOp::Lt => "lt",
            FieldOp::Lte => "lte",
            FieldOp::Contains => "contains",
            FieldOp::StartsWith => "startswith",
            FieldOp::EndsWith => "endswith",
            FieldOp::Regex => "re",
        }
    }
}

/// A boolean predicate tree over a single event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterSpec {
    /// All children must match. An empty list matches every event.
    All(Vec<FilterSpec>),
    /// At least one child must match. An empty list matches nothing.
    Any(Vec<FilterSpec>),
    Not(Box<FilterSpec>),
    /// Compare a field (dot-notation path) against an operand.
    Field {
        field: String,
        op: FieldOp,
        value: FilterValue,
    },
    /// Field presence check.
    Exists { field: String, expected: bool },
}

impl FilterSpec {
    pub fn field(field: impl Into<String>, op: FieldOp, value: impl Into<FilterValue>) -> Self {
        FilterSpec::Field {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Shorthand for an equality predicate.
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::field(field, FieldOp::Eq, value)
    }

    pub fn exists(field: impl Into<String>) -> Self {
        FilterSpec::Exists {
            field: field.into(),
            expected: true,
        }
    }

    pub fn all(children: Vec<FilterSpec>) -> Self {
        FilterSpec::All(children)
    }

    pub fn any(children: Vec<FilterSpec>) -> Self {
        FilterSpec::Any(children)
    }

    pub fn negate(inner: FilterSpec) -> Self {
        FilterSpec::Not(Box::new(inner))
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterSpec::All(children) => write_joined(f, children, " and "),
            FilterSpec::Any(children) => write_joined(f, children, " or "),
            FilterSpec::Not(inner) => write!(f, "not {inner}"),
            FilterSpec::Field { field, op, value } => {
                write!(f, "{field}|{} {value}", op.as_str())
            }
            FilterSpec::Exists { field, expected } => write!(f, "{field}|exists {expected}"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[FilterSpec], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{child}")?;
    }
    f.write_str(")")
}

// =============================================================================
// Patterns
// =============================================================================

/// Kind of temporal pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Sequence,
    Frequency,
    Correlation,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PatternKind::Sequence => "sequence",
            PatternKind::Frequency => "frequency",
            PatternKind::Correlation => "correlation",
        })
    }
}

/// Specification of one temporal pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternSpec {
    /// Ordered steps that must be satisfied by successive events within one window.
    Sequence { steps: Vec<FilterSpec>, window_ms: u64 },
    /// At least `threshold` matching events within a trailing window.
    Frequency {
        filter: FilterSpec,
        threshold: u64,
        window_ms: u64,
    },
    /// A response occurring within `window_ms` of one or more triggers.
    Correlation {
        trigger: FilterSpec,
        response: FilterSpec,
        window_ms: u64,
    },
}

impl PatternSpec {
    pub fn kind(&self) -> PatternKind {
        match self {
            PatternSpec::Sequence { .. } => PatternKind::Sequence,
            PatternSpec::Frequency { .. } => PatternKind::Frequency,
            PatternSpec::Correlation { .. } => PatternKind::Correlation,
        }
    }

    pub fn window_ms(&self) -> u64 {
        match self {
            PatternSpec::Sequence { window_ms, .. }
            | PatternSpec::Frequency { window_ms, .. }
            | PatternSpec::Correlation { window_ms, .. } => *window_ms,
        }
    }
}

/// A named pattern, as loaded from a definition file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternDefinition {
    pub id: String,
    pub title: Option<String>,
    pub spec: PatternSpec,
}

/// Result of loading one or more definition documents.
///
/// Documents that fail to load are reported in `errors` rather than aborting
/// the whole collection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PatternCollection {
    pub patterns: Vec<PatternDefinition>,
    pub errors: Vec<String>,
}

impl PatternCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Append another collection's patterns and errors.
    pub fn extend(&mut self, other: PatternCollection) {
        self.patterns.extend(other.patterns);
        self.errors.extend(other.errors);
    }
}
