//! Introspection snapshots.

use rtempo_spec::PatternKind;
use serde::Serialize;

/// Kind-tagged, read-only snapshot of a pattern's temporal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemporalStats {
    Sequence {
        /// Satisfied steps (equals `total_steps` right after a match).
        current_step: usize,
        total_steps: usize,
        /// An attempt is in progress.
        active: bool,
        sequence_start: Option<i64>,
        buffered_events: usize,
        window_ms: i64,
        total_matches: u64,
    },
    Frequency {
        /// Matching events in the window as of the last delivery.
        current_count: usize,
        threshold: usize,
        window_ms: i64,
        total_matches: u64,
    },
    Correlation {
        pending_triggers: usize,
        window_ms: i64,
        total_matches: u64,
    },
}

impl TemporalStats {
    pub fn kind(&self) -> PatternKind {
        match self {
            TemporalStats::Sequence { .. } => PatternKind::Sequence,
            TemporalStats::Frequency { .. } => PatternKind::Frequency,
            TemporalStats::Correlation { .. } => PatternKind::Correlation,
        }
    }

    pub fn total_matches(&self) -> u64 {
        match self {
            TemporalStats::Sequence { total_matches, .. }
            | TemporalStats::Frequency { total_matches, .. }
            | TemporalStats::Correlation { total_matches, .. } => *total_matches,
        }
    }
}
