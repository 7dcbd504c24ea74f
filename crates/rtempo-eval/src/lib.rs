//! # rtempo-eval
//!
//! Temporal pattern engine over event streams.
//!
//! This crate consumes the specifications produced by [`rtempo_spec`] and
//! tracks, per pattern, the state needed to recognise multi-event behaviour
//! as events arrive.
//!
//! ## Architecture
//!
//! - **Filters** (stateless): compiled once, evaluated against each event
//!   without allocation.
//! - **Matchers** (stateful): sequence, frequency and correlation state
//!   machines, each advanced by one event at a time and expired lazily on
//!   delivery.
//! - **Store**: keyed by pattern id, with per-pattern locking so deliveries
//!   to one pattern are serialized while different patterns run in parallel.
//!
//! Deliveries return an [`Outcome`]: `continue`, `matched`,
//! `threshold_exceeded` or `pattern_not_found`. Side effects on a match are
//! left to the caller, optionally through an [`ActionDispatcher`].
//!
//! ## Quick Start
//!
//! ```rust
//! use rtempo_eval::{Event, Outcome, TemporalEngine};
//! use rtempo_spec::FilterSpec;
//! use serde_json::json;
//!
//! let engine = TemporalEngine::default();
//! engine
//!     .compile_sequence_pattern(
//!         "recon-then-exploit",
//!         vec![FilterSpec::eq("type", "scan"), FilterSpec::eq("type", "exploit")],
//!         60_000,
//!     )
//!     .unwrap();
//!
//! let scan = json!({"type": "scan"});
//! let exploit = json!({"type": "exploit"});
//! let id = "recon-then-exploit";
//! assert_eq!(engine.deliver_event(id, &Event::from_value(&scan), 0), Outcome::Continue);
//! assert_eq!(engine.deliver_event(id, &Event::from_value(&exploit), 500), Outcome::Matched);
//!
//! let stats = engine.get_temporal_stats(id).unwrap();
//! assert_eq!(stats.total_matches(), 1);
//! ```

pub mod action;
pub mod compiler;
pub mod correlation;
pub mod engine;
pub mod error;
pub mod event;
pub mod filter;
pub mod frequency;
pub mod registry;
pub mod result;
pub mod sequence;
pub mod state;
pub mod stats;
pub mod store;
pub mod window;

// Re-export the most commonly used types and functions at crate root
pub use action::{ActionDispatcher, DispatchStatus, PatternAction};
pub use compiler::{
    CompiledPattern, CorrelationPattern, FrequencyPattern, SequencePattern, compile_pattern,
};
pub use correlation::CorrelationState;
pub use engine::{CorrelationFilters, EngineConfig, EpochUnit, TemporalEngine};
pub use error::{EvalError, Result};
pub use event::Event;
pub use filter::{CompiledFilter, EventFilter, compile_filter};
pub use frequency::FrequencyState;
pub use registry::PatternRegistry;
pub use result::{Outcome, PatternOutcome};
pub use sequence::{SequencePhase, SequenceState};
pub use state::TemporalState;
pub use stats::TemporalStats;
pub use store::TemporalStateStore;
pub use window::TimeWindow;
