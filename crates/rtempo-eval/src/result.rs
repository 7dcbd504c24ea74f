//! Delivery outcomes.

use std::fmt;

use rtempo_spec::PatternKind;
use serde::Serialize;

/// The result of delivering one event to one pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The event was consumed; no match signalled.
    Continue,
    /// A sequence completed or a correlation response discharged pending triggers.
    Matched,
    /// A frequency window holds at least `threshold` matching events.
    ThresholdExceeded,
    /// No temporal state exists for the pattern id.
    PatternNotFound,
}

impl Outcome {
    /// Whether a calling layer should act on this outcome.
    pub fn is_match(&self) -> bool {
        matches!(self, Outcome::Matched | Outcome::ThresholdExceeded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Continue => "continue",
            Outcome::Matched => "matched",
            Outcome::ThresholdExceeded => "threshold_exceeded",
            Outcome::PatternNotFound => "pattern_not_found",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of one pattern when an event is broadcast to all patterns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternOutcome {
    pub pattern_id: String,
    pub kind: PatternKind,
    pub outcome: Outcome,
    /// Delivery time in milliseconds since epoch.
    pub timestamp_ms: i64,
}
