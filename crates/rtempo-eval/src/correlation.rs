//! Trigger/response correlation matching.
//!
//! Trigger events accumulate in a time window. The first response event
//! that arrives while at least one trigger is pending discharges every
//! pending trigger at once and signals a single match: one control action
//! resolves the whole backlog.

use serde_json::Value;

use crate::event::Event;
use crate::filter::EventFilter;
use crate::result::Outcome;
use crate::window::TimeWindow;

/// Per-pattern pending triggers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationState {
    pending: TimeWindow<Value>,
    total_matches: u64,
}

impl CorrelationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Triggers waiting for a response, as of the last delivery.
    pub fn pending_triggers(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self) -> &TimeWindow<Value> {
        &self.pending
    }

    pub fn total_matches(&self) -> u64 {
        self.total_matches
    }

    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

/// Deliver one event to a correlation pattern.
///
/// An event matching both filters counts as a trigger.
pub fn advance<T: EventFilter, R: EventFilter>(
    state: &mut CorrelationState,
    trigger: &T,
    response: &R,
    window_ms: i64,
    event: &Event<'_>,
    now: i64,
) -> Outcome {
    state.pending.prune(now, window_ms);

    if trigger.matches(event) {
        state.pending.push(now, event.to_owned_value());
        return Outcome::Continue;
    }

    if !state.pending.is_empty() && response.matches(event) {
        log::trace!(
            "correlation response at {now} discharged {} pending triggers",
            state.pending.len()
        );
        state.pending.clear();
        state.total_matches += 1;
        return Outcome::Matched;
    }

    Outcome::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{CompiledFilter, compile_filter};
    use rtempo_spec::FilterSpec;
    use serde_json::json;

    struct Pair {
        trigger: CompiledFilter,
        response: CompiledFilter,
    }

    fn alert_ack() -> Pair {
        Pair {
            trigger: compile_filter(&FilterSpec::eq("type", "alert")).unwrap(),
            response: compile_filter(&FilterSpec::eq("type", "ack")).unwrap(),
        }
    }

    fn deliver(state: &mut CorrelationState, pair: &Pair, ty: &str, now: i64) -> Outcome {
        let v = json!({"type": ty});
        advance(
            state,
            &pair.trigger,
            &pair.response,
            5000,
            &Event::from_value(&v),
            now,
        )
    }

    #[test]
    fn test_response_discharges_all_triggers() {
        let pair = alert_ack();
        let mut state = CorrelationState::new();
        assert_eq!(deliver(&mut state, &pair, "alert", 0), Outcome::Continue);
        assert_eq!(deliver(&mut state, &pair, "alert", 100), Outcome::Continue);
        assert_eq!(state.pending_triggers(), 2);
        assert_eq!(deliver(&mut state, &pair, "ack", 200), Outcome::Matched);
        assert_eq!(state.pending_triggers(), 0);
        assert_eq!(state.total_matches(), 1);
        // A second ack has nothing to discharge.
        assert_eq!(deliver(&mut state, &pair, "ack", 300), Outcome::Continue);
        assert_eq!(state.total_matches(), 1);
    }

    #[test]
    fn test_response_without_trigger() {
        let pair = alert_ack();
        let mut state = CorrelationState::new();
        assert_eq!(deliver(&mut state, &pair, "ack", 0), Outcome::Continue);
        assert_eq!(state.total_matches(), 0);
    }

    #[test]
    fn test_expired_trigger_does_not_correlate() {
        let pair = alert_ack();
        let mut state = CorrelationState::new();
        deliver(&mut state, &pair, "alert", 0);
        assert_eq!(deliver(&mut state, &pair, "ack", 5001), Outcome::Continue);
        assert_eq!(state.pending_triggers(), 0);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let pair = alert_ack();
        let mut state = CorrelationState::new();
        deliver(&mut state, &pair, "alert", 0);
        assert_eq!(deliver(&mut state, &pair, "ack", 5000), Outcome::Matched);
    }

    #[test]
    fn test_unrelated_event_prunes() {
        let pair = alert_ack();
        let mut state = CorrelationState::new();
        deliver(&mut state, &pair, "alert", 0);
        deliver(&mut state, &pair, "alert", 4000);
        assert_eq!(deliver(&mut state, &pair, "noise", 6000), Outcome::Continue);
        assert_eq!(state.pending_triggers(), 1);
    }

    #[test]
    fn test_event_matching_both_is_a_trigger() {
        let both = compile_filter(&FilterSpec::exists("type")).unwrap();
        let mut state = CorrelationState::new();
        let v = json!({"type": "anything"});
        let e = Event::from_value(&v);
        assert_eq!(advance(&mut state, &both, &both, 1000, &e, 0), Outcome::Continue);
        assert_eq!(advance(&mut state, &both, &both, 1000, &e, 1), Outcome::Continue);
        assert_eq!(state.pending_triggers(), 2);
    }
}
