//! Per-pattern actions invoked by the delivery layer on a match.
//!
//! The temporal core only reports outcomes. A caller that wants side
//! effects registers a [`PatternAction`] per pattern id with an
//! [`ActionDispatcher`] and hands each delivery outcome to
//! [`ActionDispatcher::dispatch`]. A panicking action is contained and
//! reported as [`DispatchStatus::Failed`]; it never poisons the engine.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::event::Event;
use crate::result::Outcome;

type EventHandler = Arc<dyn Fn(&Event<'_>) + Send + Sync>;
type PatternEventHandler = Arc<dyn Fn(&str, &Event<'_>) + Send + Sync>;

/// What to do when a pattern matches.
#[derive(Clone, Default)]
pub enum PatternAction {
    #[default]
    None,
    /// Handler receiving the matching event.
    Event(EventHandler),
    /// Handler receiving the pattern id and the matching event.
    PatternEvent(PatternEventHandler),
}

impl PatternAction {
    pub fn on_event<F>(f: F) -> Self
    where
        F: Fn(&Event<'_>) + Send + Sync + 'static,
    {
        PatternAction::Event(Arc::new(f))
    }

    pub fn on_pattern_event<F>(f: F) -> Self
    where
        F: Fn(&str, &Event<'_>) + Send + Sync + 'static,
    {
        PatternAction::PatternEvent(Arc::new(f))
    }

    fn invoke(&self, pattern_id: &str, event: &Event<'_>) {
        match self {
            PatternAction::None => {}
            PatternAction::Event(f) => f(event),
            PatternAction::PatternEvent(f) => f(pattern_id, event),
        }
    }
}

impl fmt::Debug for PatternAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternAction::None => f.write_str("None"),
            PatternAction::Event(_) => f.write_str("Event(..)"),
            PatternAction::PatternEvent(_) => f.write_str("PatternEvent(..)"),
        }
    }
}

/// Result of handing one outcome to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// No match, or no action registered for the pattern.
    Skipped,
    Invoked,
    /// The action panicked.
    Failed,
}

#[derive(Debug, Default)]
pub struct ActionDispatcher {
    actions: RwLock<HashMap<String, PatternAction>>,
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) the action for a pattern.
    pub fn set_action(&self, pattern_id: &str, action: PatternAction) {
        self.actions.write().insert(pattern_id.to_string(), action);
    }

    pub fn remove_action(&self, pattern_id: &str) -> Option<PatternAction> {
        self.actions.write().remove(pattern_id)
    }

    pub fn has_action(&self, pattern_id: &str) -> bool {
        self.actions
            .read()
            .get(pattern_id)
            .is_some_and(|a| !matches!(a, PatternAction::None))
    }

    /// Invoke the pattern's action if `outcome` is a match.
    pub fn dispatch(&self, pattern_id: &str, outcome: Outcome, event: &Event<'_>) -> DispatchStatus {
        if !outcome.is_match() {
            return DispatchStatus::Skipped;
        }

        // Clone out of the map so the action may itself touch the dispatcher.
        let action = match self.actions.read().get(pattern_id) {
            Some(PatternAction::None) | None => return DispatchStatus::Skipped,
            Some(action) => action.clone(),
        };

        match catch_unwind(AssertUnwindSafe(|| action.invoke(pattern_id, event))) {
            Ok(()) => DispatchStatus::Invoked,
            Err(payload) => {
                let msg = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                log::error!("action for pattern '{pattern_id}' panicked: {msg}");
                DispatchStatus::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_dispatch_only_on_match() {
        let hits = Arc::new(AtomicUsize::new(0));
        let dispatcher = ActionDispatcher::new();
        let h = hits.clone();
        dispatcher.set_action(
            "p1",
            PatternAction::on_event(move |_| {
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let v = json!({"type": "x"});
        let e = Event::from_value(&v);
        assert_eq!(dispatcher.dispatch("p1", Outcome::Continue, &e), DispatchStatus::Skipped);
        assert_eq!(dispatcher.dispatch("p1", Outcome::Matched, &e), DispatchStatus::Invoked);
        assert_eq!(
            dispatcher.dispatch("p1", Outcome::ThresholdExceeded, &e),
            DispatchStatus::Invoked
        );
        assert_eq!(dispatcher.dispatch("p2", Outcome::Matched, &e), DispatchStatus::Skipped);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_pattern_event_receives_id() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let dispatcher = ActionDispatcher::new();
        let s = seen.clone();
        dispatcher.set_action(
            "brute",
            PatternAction::on_pattern_event(move |id, event| {
                s.lock().push((id.to_string(), event.get_field("user").cloned()));
            }),
        );
        let v = json!({"user": "root"});
        dispatcher.dispatch("brute", Outcome::Matched, &Event::from_value(&v));
        assert_eq!(seen.lock().as_slice(), &[("brute".to_string(), Some(json!("root")))]);
    }

    #[test]
    fn test_panicking_action_is_contained() {
        let dispatcher = ActionDispatcher::new();
        dispatcher.set_action("p1", PatternAction::on_event(|_| panic!("boom")));
        let v = json!({});
        let e = Event::from_value(&v);
        assert_eq!(dispatcher.dispatch("p1", Outcome::Matched, &e), DispatchStatus::Failed);
        // Still usable afterwards.
        assert_eq!(dispatcher.dispatch("p1", Outcome::Matched, &e), DispatchStatus::Failed);
        assert!(dispatcher.remove_action("p1").is_some());
        assert!(!dispatcher.has_action("p1"));
    }

    #[test]
    fn test_none_action_is_skipped() {
        let dispatcher = ActionDispatcher::new();
        dispatcher.set_action("p1", PatternAction::None);
        let v = json!({});
        assert!(!dispatcher.has_action("p1"));
        assert_eq!(
            dispatcher.dispatch("p1", Outcome::Matched, &Event::from_value(&v)),
            DispatchStatus::Skipped
        );
    }
}
