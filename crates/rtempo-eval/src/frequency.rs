//! Sliding-window frequency matching.

use serde_json::Value;

use crate::event::Event;
use crate::filter::EventFilter;
use crate::result::Outcome;
use crate::window::TimeWindow;

/// Per-pattern frequency window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyState {
    recent: TimeWindow<Value>,
    total_matches: u64,
}

impl FrequencyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matching events in the window as of the last delivery.
    pub fn count(&self) -> usize {
        self.recent.len()
    }

    pub fn recent_events(&self) -> &TimeWindow<Value> {
        &self.recent
    }

    pub fn total_matches(&self) -> u64 {
        self.total_matches
    }

    pub fn reset(&mut self) {
        self.recent.clear();
    }
}

/// Deliver one event to a frequency pattern.
///
/// The window is pruned on every call, matching or not, and the threshold is
/// re-checked every time: while the count stays at or above `threshold`,
/// each delivery reports [`Outcome::ThresholdExceeded`].
pub fn advance<F: EventFilter>(
    state: &mut FrequencyState,
    filter: &F,
    threshold: usize,
    window_ms: i64,
    event: &Event<'_>,
    now: i64,
) -> Outcome {
    if filter.matches(event) {
        state.recent.push(now, event.to_owned_value());
    }

    let evicted = state.recent.prune(now, window_ms);
    if evicted > 0 {
        log::trace!("frequency window evicted {evicted} entries at {now}");
    }

    if state.recent.len() >= threshold {
        state.total_matches += 1;
        Outcome::ThresholdExceeded
    } else {
        Outcome::Continue
    }
}
