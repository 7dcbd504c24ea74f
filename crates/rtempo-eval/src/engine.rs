//! Temporal pattern engine.
//!
//! Composes the compiler, the state store and the pattern registry behind
//! one `Send + Sync` facade. Callers compile patterns once and then deliver
//! events to them by id, from as many threads as they like.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rtempo_spec::{FilterSpec, PatternCollection, PatternDefinition, PatternKind, PatternSpec};

use crate::compiler::{CompiledPattern, compile_pattern};
use crate::correlation;
use crate::error::{EvalError, Result};
use crate::event::Event;
use crate::frequency;
use crate::registry::PatternRegistry;
use crate::result::{Outcome, PatternOutcome};
use crate::sequence;
use crate::state::TemporalState;
use crate::stats::TemporalStats;
use crate::store::TemporalStateStore;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the temporal engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Field names to try for timestamp extraction, in order of priority.
    ///
    /// The engine will try each field until one yields a parseable timestamp.
    /// If none succeed, falls back to `Utc::now()`.
    pub timestamp_fields: Vec<String>,

    /// How numeric timestamp values are read. String timestamps are
    /// unaffected.
    pub epoch_unit: EpochUnit,
}

/// Unit of numeric epoch timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EpochUnit {
    /// Magnitudes below 1e12 are seconds, larger ones milliseconds. Millisecond
    /// values before 2001-09-09 are therefore misread as seconds.
    #[default]
    Auto,
    Seconds,
    Milliseconds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            timestamp_fields: vec![
                "@timestamp".to_string(),
                "timestamp".to_string(),
                "EventTime".to_string(),
                "TimeCreated".to_string(),
                "eventTime".to_string(),
            ],
            epoch_unit: EpochUnit::Auto,
        }
    }
}

/// Trigger and response filters of a correlation pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationFilters {
    pub trigger: FilterSpec,
    pub response: FilterSpec,
}

// =============================================================================
// Engine
// =============================================================================

/// Stateful engine for sequence, frequency and correlation patterns.
///
/// # Example
///
/// ```rust
/// use rtempo_eval::{Event, Outcome, TemporalEngine};
/// use rtempo_spec::FilterSpec;
/// use serde_json::json;
///
/// let engine = TemporalEngine::default();
/// engine
///     .compile_frequency_pattern("burst", FilterSpec::eq("type", "login_failed"), 2, 1000)
///     .unwrap();
///
/// let ev = json!({"type": "login_failed"});
/// let event = Event::from_value(&ev);
/// assert_eq!(engine.deliver_event("burst", &event, 0), Outcome::Continue);
/// assert_eq!(engine.deliver_event("burst", &event, 10), Outcome::ThresholdExceeded);
/// ```
#[derive(Debug)]
pub struct TemporalEngine {
    store: TemporalStateStore,
    registry: Arc<PatternRegistry>,
    config: EngineConfig,
}

impl TemporalEngine {
    /// Create an engine with its own registry.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_registry(config, Arc::new(PatternRegistry::new()))
    }

    /// Create an engine that records compiled ids in a caller-owned registry.
    pub fn with_registry(config: EngineConfig, registry: Arc<PatternRegistry>) -> Self {
        TemporalEngine {
            store: TemporalStateStore::new(),
            registry,
            config,
        }
    }

    // =========================================================================
    // Compilation
    // =========================================================================

    /// Compile an ordered sequence of filters. Returns the pattern id.
    pub fn compile_sequence_pattern(
        &self,
        id: &str,
        steps: Vec<FilterSpec>,
        window_ms: u64,
    ) -> Result<String> {
        self.install(id, &PatternSpec::Sequence { steps, window_ms })
    }

    /// Compile a sliding-window threshold pattern. Returns the pattern id.
    pub fn compile_frequency_pattern(
        &self,
        id: &str,
        filter: FilterSpec,
        threshold: u64,
        window_ms: u64,
    ) -> Result<String> {
        self.install(
            id,
            &PatternSpec::Frequency {
                filter,
                threshold,
                window_ms,
            },
        )
    }

    /// Compile a trigger/response pattern. Returns the pattern id.
    pub fn compile_correlation_pattern(
        &self,
        id: &str,
        filters: CorrelationFilters,
        window_ms: u64,
    ) -> Result<String> {
        self.install(
            id,
            &PatternSpec::Correlation {
                trigger: filters.trigger,
                response: filters.response,
                window_ms,
            },
        )
    }

    /// Compile a loaded pattern definition.
    pub fn compile_pattern(&self, definition: &PatternDefinition) -> Result<String> {
        self.install(&definition.id, &definition.spec)
    }

    /// Compile every definition in a collection, stopping at the first error.
    pub fn add_collection(&self, collection: &PatternCollection) -> Result<()> {
        for definition in &collection.patterns {
            self.compile_pattern(definition)?;
        }
        Ok(())
    }

    fn install(&self, id: &str, spec: &PatternSpec) -> Result<String> {
        if id.is_empty() {
            return Err(EvalError::InvalidSpec("pattern id must not be empty".to_string()));
        }
        let compiled = compile_pattern(spec)?;
        // Registry membership changes under the store's map lock, so the two
        // never disagree once a create or clear returns.
        self.store.create_with(id, compiled, || {
            self.registry.register(id);
        })?;
        log::debug!(
            "compiled {} pattern '{id}' (window {}ms)",
            spec.kind(),
            spec.window_ms()
        );
        Ok(id.to_string())
    }

    // =========================================================================
    // Delivery
    // =========================================================================

    /// Deliver an event to one pattern at an explicit time (ms since epoch).
    pub fn deliver_event(&self, id: &str, event: &Event<'_>, now_ms: i64) -> Outcome {
        match self.deliver(id, event, now_ms) {
            Some((_, outcome)) => outcome,
            None => {
                log::debug!("event delivered to unknown pattern '{id}'");
                Outcome::PatternNotFound
            }
        }
    }

    /// Deliver an event, taking the time from the event's timestamp fields.
    ///
    /// Falls back to `Utc::now()` if no timestamp field is found or parseable.
    /// Numeric timestamps are read per [`EngineConfig::epoch_unit`]; with the
    /// default [`EpochUnit::Auto`], a value below 1e12 is taken as seconds.
    pub fn deliver_event_now(&self, id: &str, event: &Event<'_>) -> Outcome {
        let now = self.extract_timestamp(event);
        self.deliver_event(id, event, now)
    }

    /// Deliver one event to every compiled pattern, in id order.
    pub fn broadcast_event(&self, event: &Event<'_>, now_ms: i64) -> Vec<PatternOutcome> {
        self.store
            .ids()
            .into_iter()
            .filter_map(|id| {
                // A pattern cleared since `ids()` was taken is skipped.
                let (kind, outcome) = self.deliver(&id, event, now_ms)?;
                Some(PatternOutcome {
                    pattern_id: id,
                    kind,
                    outcome,
                    timestamp_ms: now_ms,
                })
            })
            .collect()
    }

    /// [`broadcast_event`](Self::broadcast_event) with the time taken from the event.
    pub fn broadcast_event_now(&self, event: &Event<'_>) -> Vec<PatternOutcome> {
        let now = self.extract_timestamp(event);
        self.broadcast_event(event, now)
    }

    fn deliver(&self, id: &str, event: &Event<'_>, now: i64) -> Option<(PatternKind, Outcome)> {
        let (kind, outcome) = self.store.update(id, |pattern, state| {
            (pattern.kind(), step(pattern, state, event, now))
        })?;
        if outcome.is_match() {
            log::debug!("{kind} pattern '{id}' {outcome} at {now}");
        }
        Some((kind, outcome))
    }

    // =========================================================================
    // Introspection and lifecycle
    // =========================================================================

    /// Read-only snapshot of a pattern's state.
    pub fn get_temporal_stats(&self, id: &str) -> Result<TemporalStats> {
        self.store
            .inspect(id, |pattern, state| state.stats(pattern))
            .ok_or_else(|| EvalError::PatternNotFound(id.to_string()))?
            .ok_or_else(|| EvalError::StateMismatch(id.to_string()))
    }

    /// Drop a pattern's state and unregister it. Clearing an unknown id is
    /// not an error.
    pub fn clear_temporal_state(&self, id: &str) -> Result<()> {
        let removed = self.store.remove_with(id, |_| {
            self.registry.unregister(id);
        });
        if removed {
            log::debug!("cleared pattern '{id}'");
        }
        Ok(())
    }

    /// Return a pattern's state to its initial value, keeping the pattern.
    pub fn reset_temporal_state(&self, id: &str) -> Result<()> {
        self.store
            .update(id, |pattern, state| *state = TemporalState::new_for(pattern))
            .ok_or_else(|| EvalError::PatternNotFound(id.to_string()))
    }

    pub fn pattern_count(&self) -> usize {
        self.store.len()
    }

    /// Ids of all compiled patterns, sorted.
    pub fn pattern_ids(&self) -> Vec<String> {
        self.store.ids()
    }

    pub fn pattern_kind(&self, id: &str) -> Option<PatternKind> {
        self.store.kind(id)
    }

    pub fn registry(&self) -> &Arc<PatternRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Extract a timestamp (ms since epoch) from an event.
    ///
    /// Tries each configured timestamp field in order. Supports:
    /// - Numeric values, in the configured [`EpochUnit`]
    /// - ISO 8601 strings (e.g., "2024-07-10T12:30:00Z")
    ///
    /// Falls back to `Utc::now()` if no field yields a valid timestamp.
    pub fn extract_timestamp(&self, event: &Event<'_>) -> i64 {
        for field_name in &self.config.timestamp_fields {
            if let Some(val) = event.get_field(field_name)
                && let Some(ts) = parse_timestamp_value(val, self.config.epoch_unit)
            {
                return ts;
            }
        }
        Utc::now().timestamp_millis()
    }
}

impl Default for TemporalEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Run the matcher for the pattern's kind.
fn step(pattern: &CompiledPattern, state: &mut TemporalState, event: &Event<'_>, now: i64) -> Outcome {
    match (pattern, state) {
        (CompiledPattern::Sequence(p), TemporalState::Sequence(s)) => {
            sequence::advance(s, &p.steps, p.window_ms, event, now)
        }
        (CompiledPattern::Frequency(p), TemporalState::Frequency(s)) => {
            frequency::advance(s, &p.filter, p.threshold, p.window_ms, event, now)
        }
        (CompiledPattern::Correlation(p), TemporalState::Correlation(s)) => {
            correlation::advance(s, &p.trigger, &p.response, p.window_ms, event, now)
        }
        (pattern, state) => {
            // The store rejects mismatched puts, so this is unreachable in practice.
            log::warn!(
                "{} state stored under {} pattern; event ignored",
                state.kind(),
                pattern.kind()
            );
            Outcome::Continue
        }
    }
}

// =============================================================================
// Timestamp parsing helpers
// =============================================================================

/// Parse a JSON value as a Unix epoch timestamp in milliseconds.
fn parse_timestamp_value(val: &serde_json::Value, unit: EpochUnit) -> Option<i64> {
    match val {
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(normalize_epoch(i, unit))
            } else {
                n.as_f64().and_then(|v| normalize_epoch_f64(v, unit))
            }
        }
        serde_json::Value::String(s) => parse_timestamp_string(s),
        _ => None,
    }
}

/// Normalize an epoch value to milliseconds.
fn normalize_epoch(v: i64, unit: EpochUnit) -> i64 {
    match unit {
        EpochUnit::Seconds => v.saturating_mul(1000),
        EpochUnit::Milliseconds => v,
        EpochUnit::Auto if v.abs() < 1_000_000_000_000 => v.saturating_mul(1000),
        EpochUnit::Auto => v,
    }
}

fn normalize_epoch_f64(v: f64, unit: EpochUnit) -> Option<i64> {
    if !v.is_finite() {
        return None;
    }
    let seconds = match unit {
        EpochUnit::Seconds => true,
        EpochUnit::Milliseconds => false,
        EpochUnit::Auto => v.abs() < 1e12,
    };
    let ms = if seconds { v * 1000.0 } else { v };
    Some(ms as i64)
}

/// Parse a timestamp string. Tries ISO 8601 with timezone, then without.
fn parse_timestamp_string(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }

    // Without timezone, assume UTC
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
    ];
    NAIVE_FORMATS.iter().find_map(|fmt| {
        chrono::NaiveDateTime::parse_from_str(s, fmt)
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive).timestamp_millis())
    })
}

// =============================================================================
// Tests
// =============================================================================
