//! Sequence matching as an explicit state machine.
//!
//! A sequence pattern is an ordered list of step filters that successive
//! events must satisfy within `window_ms` of the first step. The automaton has
//! three phases:
//!
//! ```text
//!            step 0 matches                  last step matches
//!   Idle ─────────────────────> InProgress ─────────────────────> Completed
//!    ^  <── mismatch / expiry ──     │                                │
//!    └───────────────────── any next event (reset first) ─────────────┘
//! ```
//!
//! [`transition`] is the pure transition function; [`advance`] applies it to
//! a [`SequenceState`], maintaining the event buffer and match counter.
//!
//! A completed sequence stays `Completed` until the next delivery, so the
//! `matched` outcome is reported to exactly one caller and the completing
//! event remains in the buffer for inspection.

use serde_json::Value;

use crate::event::Event;
use crate::filter::EventFilter;
use crate::result::Outcome;

/// Where a sequence currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencePhase {
    #[default]
    Idle,
    /// `step` steps are satisfied (1 ≤ step < len); `started_at` is the time
    /// step 0 matched.
    InProgress { step: usize, started_at: i64 },
    /// Every step was satisfied by the most recent delivery.
    Completed,
}

impl SequencePhase {
    /// Number of satisfied steps for a sequence of `total_steps`.
    pub fn current_step(&self, total_steps: usize) -> usize {
        match self {
            SequencePhase::Idle => 0,
            SequencePhase::InProgress { step, .. } => *step,
            SequencePhase::Completed => total_steps,
        }
    }

    pub fn started_at(&self) -> Option<i64> {
        match self {
            SequencePhase::InProgress { started_at, .. } => Some(*started_at),
            _ => None,
        }
    }
}

/// What a single delivery did to the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// No step matched from idle.
    Ignored,
    /// Step 0 matched; a new attempt began.
    Started,
    /// The next expected step matched.
    Advanced,
    /// The final step matched.
    Completed,
    /// The next expected step did not match; the attempt was abandoned.
    Aborted,
}

/// Result of the transition function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: SequencePhase,
    pub progress: Progress,
    /// Earlier progress (a completed or expired attempt) was discarded before
    /// this event was considered.
    pub reset: bool,
}

/// Pure transition: `phase × event → (phase', progress)`.
///
/// Expiry uses a strict comparison: an event exactly `window_ms` after the
/// first step still belongs to the attempt.
pub fn transition<F: EventFilter>(
    phase: SequencePhase,
    steps: &[F],
    window_ms: i64,
    event: &Event<'_>,
    now: i64,
) -> Transition {
    match phase {
        SequencePhase::Idle => start(steps, event, now, false),
        SequencePhase::Completed => start(steps, event, now, true),
        SequencePhase::InProgress { started_at, .. }
            if now.saturating_sub(started_at) > window_ms =>
        {
            // Expired: the same event may open a fresh attempt.
            start(steps, event, now, true)
        }
        SequencePhase::InProgress { step, started_at } => match steps.get(step) {
            Some(filter) if filter.matches(event) => {
                let next_step = step + 1;
                if next_step >= steps.len() {
                    Transition {
                        next: SequencePhase::Completed,
                        progress: Progress::Completed,
                        reset: false,
                    }
                } else {
                    Transition {
                        next: SequencePhase::InProgress {
                            step: next_step,
                            started_at,
                        },
                        progress: Progress::Advanced,
                        reset: false,
                    }
                }
            }
            // A mismatch aborts without re-trying the event as a new step 0.
            _ => Transition {
                next: SequencePhase::Idle,
                progress: Progress::Aborted,
                reset: true,
            },
        },
    }
}

fn start<F: EventFilter>(steps: &[F], event: &Event<'_>, now: i64, reset: bool) -> Transition {
    match steps.first() {
        Some(first) if first.matches(event) => {
            if steps.len() == 1 {
                Transition {
                    next: SequencePhase::Completed,
                    progress: Progress::Completed,
                    reset,
                }
            } else {
                Transition {
                    next: SequencePhase::InProgress {
                        step: 1,
                        started_at: now,
                    },
                    progress: Progress::Started,
                    reset,
                }
            }
        }
        _ => Transition {
            next: SequencePhase::Idle,
            progress: Progress::Ignored,
            reset,
        },
    }
}

// =============================================================================
// State
// =============================================================================

/// An event retained by an in-progress sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedEvent {
    pub timestamp_ms: i64,
    pub event: Value,
}

/// Per-pattern sequence progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequenceState {
    phase: SequencePhase,
    buffered: Vec<BufferedEvent>,
    total_matches: u64,
}

impl SequenceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SequencePhase {
        self.phase
    }

    /// Time the current attempt started; set iff the sequence is in progress.
    pub fn sequence_start(&self) -> Option<i64> {
        self.phase.started_at()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, SequencePhase::InProgress { .. })
    }

    /// Events that satisfied the steps of the current (or just-completed) attempt.
    pub fn buffered_events(&self) -> &[BufferedEvent] {
        &self.buffered
    }

    pub fn total_matches(&self) -> u64 {
        self.total_matches
    }

    /// Drop progress but keep the match counter.
    pub fn reset(&mut self) {
        self.phase = SequencePhase::Idle;
        self.buffered.clear();
    }
}

/// Deliver one event to a sequence.
pub fn advance<F: EventFilter>(
    state: &mut SequenceState,
    steps: &[F],
    window_ms: i64,
    event: &Event<'_>,
    now: i64,
) -> Outcome {
    let t = transition(state.phase, steps, window_ms, event, now);

    if t.reset {
        log::trace!("sequence reset from {:?} at {now}", state.phase);
        state.buffered.clear();
    }
    state.phase = t.next;

    match t.progress {
        // Aborted always carries `reset`, so the buffer is already empty.
        Progress::Ignored | Progress::Aborted => Outcome::Continue,
        Progress::Started | Progress::Advanced => {
            state.buffered.push(BufferedEvent {
                timestamp_ms: now,
                event: event.to_owned_value(),
            });
            Outcome::Continue
        }
        Progress::Completed => {
            state.buffered.push(BufferedEvent {
                timestamp_ms: now,
                event: event.to_owned_value(),
            });
            state.total_matches += 1;
            Outcome::Matched
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{CompiledFilter, compile_filter};
    use rtempo_spec::FilterSpec;
    use serde_json::json;

    fn steps(types: &[&str]) -> Vec<CompiledFilter> {
        types
            .iter()
            .map(|t| compile_filter(&FilterSpec::eq("type", *t)).unwrap())
            .collect()
    }

    fn deliver(state: &mut SequenceState, steps: &[CompiledFilter], ty: &str, now: i64) -> Outcome {
        let v = json!({"type": ty});
        advance(state, steps, 1000, &Event::from_value(&v), now)
    }

    /// Transition table over a two-step sequence [a, b] with a 1000 ms window.
    #[test]
    fn test_transition_table() {
        let ab = steps(&["a", "b"]);
        let in_progress = SequencePhase::InProgress {
            step: 1,
            started_at: 0,
        };

        #[rustfmt::skip]
        let table: Vec<(SequencePhase, &str, i64, SequencePhase, Progress, bool)> = vec![
            (SequencePhase::Idle, "a", 0, in_progress, Progress::Started, false),
            (SequencePhase::Idle, "b", 0, SequencePhase::Idle, Progress::Ignored, false),
            (in_progress, "b", 500, SequencePhase::Completed, Progress::Completed, false),
            (in_progress, "b", 1000, SequencePhase::Completed, Progress::Completed, false),
            (in_progress, "c", 500, SequencePhase::Idle, Progress::Aborted, true),
            (in_progress, "a", 500, SequencePhase::Idle, Progress::Aborted, true),
            (in_progress, "b", 1001, SequencePhase::Idle, Progress::Ignored, true),
            (in_progress, "a", 1500, SequencePhase::InProgress { step: 1, started_at: 1500 }, Progress::Started, true),
            (SequencePhase::Completed, "c", 2000, SequencePhase::Idle, Progress::Ignored, true),
            (SequencePhase::Completed, "a", 2000, SequencePhase::InProgress { step: 1, started_at: 2000 }, Progress::Started, true),
        ];

        for (i, (phase, ty, now, next, progress, reset)) in table.into_iter().enumerate() {
            let v = json!({"type": ty});
            let t = transition(phase, &ab, 1000, &Event::from_value(&v), now);
            assert_eq!(
                t,
                Transition { next, progress, reset },
                "row {i}: {phase:?} + {ty}@{now}"
            );
        }
    }

    #[test]
    fn test_completion_then_lazy_reset() {
        let ab = steps(&["a", "b"]);
        let mut state = SequenceState::new();

        assert_eq!(deliver(&mut state, &ab, "a", 0), Outcome::Continue);
        assert_eq!(state.sequence_start(), Some(0));
        assert_eq!(deliver(&mut state, &ab, "b", 200), Outcome::Matched);
        assert_eq!(state.phase(), SequencePhase::Completed);
        assert_eq!(state.buffered_events().len(), 2);
        assert_eq!(state.total_matches(), 1);
        assert_eq!(state.sequence_start(), None);

        assert_eq!(deliver(&mut state, &ab, "c", 300), Outcome::Continue);
        assert_eq!(state.phase(), SequencePhase::Idle);
        assert!(state.buffered_events().is_empty());
        assert_eq!(state.total_matches(), 1);
    }

    #[test]
    fn test_out_of_order_does_not_advance() {
        let abc = steps(&["a", "b", "c"]);
        let mut state = SequenceState::new();
        assert_eq!(deliver(&mut state, &abc, "a", 0), Outcome::Continue);
        // "c" skips "b": aborts the attempt
        assert_eq!(deliver(&mut state, &abc, "c", 10), Outcome::Continue);
        assert_eq!(state.phase(), SequencePhase::Idle);
        assert_eq!(deliver(&mut state, &abc, "b", 20), Outcome::Continue);
        assert_eq!(state.phase(), SequencePhase::Idle);
    }

    #[test]
    fn test_duplicate_steps() {
        let aa = steps(&["a", "a"]);
        let mut state = SequenceState::new();
        assert_eq!(deliver(&mut state, &aa, "a", 0), Outcome::Continue);
        assert_eq!(deliver(&mut state, &aa, "a", 1), Outcome::Matched);
        assert_eq!(deliver(&mut state, &aa, "a", 2), Outcome::Continue);
        assert_eq!(deliver(&mut state, &aa, "a", 3), Outcome::Matched);
        assert_eq!(state.total_matches(), 2);
    }

    #[test]
    fn test_single_step_sequence_matches_immediately() {
        let a = steps(&["a"]);
        let mut state = SequenceState::new();
        assert_eq!(deliver(&mut state, &a, "a", 0), Outcome::Matched);
        assert_eq!(deliver(&mut state, &a, "a", 5), Outcome::Matched);
        assert_eq!(deliver(&mut state, &a, "x", 6), Outcome::Continue);
        assert_eq!(state.total_matches(), 2);
    }

    #[test]
    fn test_expiry_restarts_with_same_event() {
        let ab = steps(&["a", "b"]);
        let mut state = SequenceState::new();
        deliver(&mut state, &ab, "a", 0);
        assert_eq!(deliver(&mut state, &ab, "a", 5000), Outcome::Continue);
        assert_eq!(state.sequence_start(), Some(5000));
        assert_eq!(state.buffered_events().len(), 1);
        assert_eq!(state.buffered_events()[0].timestamp_ms, 5000);
        assert_eq!(deliver(&mut state, &ab, "b", 5500), Outcome::Matched);
    }

    #[test]
    fn test_fn_filters_drive_the_automaton() {
        fn is_open(e: &Event<'_>) -> bool {
            e.get_field("op") == Some(&json!("open"))
        }
        fn is_close(e: &Event<'_>) -> bool {
            e.get_field("op") == Some(&json!("close"))
        }
        let steps: [fn(&Event<'_>) -> bool; 2] = [is_open, is_close];
        let mut state = SequenceState::new();
        let open = json!({"op": "open"});
        let close = json!({"op": "close"});
        assert_eq!(
            advance(&mut state, &steps, 100, &Event::from_value(&open), 0),
            Outcome::Continue
        );
        assert_eq!(
            advance(&mut state, &steps, 100, &Event::from_value(&close), 50),
            Outcome::Matched
        );
    }
}
