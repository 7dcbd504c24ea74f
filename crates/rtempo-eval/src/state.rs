//! Per-pattern temporal state.

use rtempo_spec::PatternKind;

use crate::compiler::CompiledPattern;
use crate::correlation::CorrelationState;
use crate::frequency::FrequencyState;
use crate::sequence::SequenceState;
use crate::stats::TemporalStats;

/// Mutable progress record of one pattern, polymorphic over the pattern kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TemporalState {
    Sequence(SequenceState),
    Frequency(FrequencyState),
    Correlation(CorrelationState),
}

impl TemporalState {
    /// Fresh state for a compiled pattern.
    pub fn new_for(pattern: &CompiledPattern) -> Self {
        match pattern {
            CompiledPattern::Sequence(_) => TemporalState::Sequence(SequenceState::new()),
            CompiledPattern::Frequency(_) => TemporalState::Frequency(FrequencyState::new()),
            CompiledPattern::Correlation(_) => TemporalState::Correlation(CorrelationState::new()),
        }
    }

    pub fn kind(&self) -> PatternKind {
        match self {
            TemporalState::Sequence(_) => PatternKind::Sequence,
            TemporalState::Frequency(_) => PatternKind::Frequency,
            TemporalState::Correlation(_) => PatternKind::Correlation,
        }
    }

    pub fn total_matches(&self) -> u64 {
        match self {
            TemporalState::Sequence(s) => s.total_matches(),
            TemporalState::Frequency(s) => s.total_matches(),
            TemporalState::Correlation(s) => s.total_matches(),
        }
    }

    /// Read-only snapshot for introspection.
    ///
    /// The pattern supplies the static half of the snapshot (step count,
    /// threshold, window); a state/pattern kind mismatch yields `None`.
    pub fn stats(&self, pattern: &CompiledPattern) -> Option<TemporalStats> {
        Some(match (self, pattern) {
            (TemporalState::Sequence(s), CompiledPattern::Sequence(p)) => TemporalStats::Sequence {
                current_step: s.phase().current_step(p.steps.len()),
                total_steps: p.steps.len(),
                active: s.is_active(),
                sequence_start: s.sequence_start(),
                buffered_events: s.buffered_events().len(),
                window_ms: p.window_ms,
                total_matches: s.total_matches(),
            },
            (TemporalState::Frequency(s), CompiledPattern::Frequency(p)) => {
                TemporalStats::Frequency {
                    current_count: s.count(),
                    threshold: p.threshold,
                    window_ms: p.window_ms,
                    total_matches: s.total_matches(),
                }
            }
            (TemporalState::Correlation(s), CompiledPattern::Correlation(p)) => {
                TemporalStats::Correlation {
                    pending_triggers: s.pending_triggers(),
                    window_ms: p.window_ms,
                    total_matches: s.total_matches(),
                }
            }
            _ => return None,
        })
    }
}
