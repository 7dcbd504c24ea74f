//! # rtempo-spec
//!
//! Pattern and filter specifications for the rtempo temporal pattern engine.
//!
//! A pattern is one of three temporal shapes, each built from single-event
//! filters:
//!
//! - **Sequence**: ordered steps satisfied by successive events within a window
//! - **Frequency**: at least `threshold` matching events within a trailing window
//! - **Correlation**: a response event following one or more trigger events
//!   within a window
//!
//! Specifications can be built in code or loaded from multi-document YAML.
//!
//! ## Quick Start
//!
//! ```rust
//! use rtempo_spec::{PatternKind, parse_pattern_yaml};
//!
//! let yaml = r#"
//! id: login-burst
//! frequency:
//!     filter: { EventType: login_failed }
//!     threshold: 5
//!     window: 30s
//! "#;
//!
//! let collection = parse_pattern_yaml(yaml).unwrap();
//! assert_eq!(collection.patterns.len(), 1);
//! assert_eq!(collection.patterns[0].spec.kind(), PatternKind::Frequency);
//! assert_eq!(collection.patterns[0].spec.window_ms(), 30_000);
//! ```

pub mod ast;
pub mod error;
pub mod parser;
pub mod value;

pub use ast::{
    FieldOp, FilterSpec, PatternCollection, PatternDefinition, PatternKind, PatternSpec,
};
pub use error::{Result, SpecError};
pub use parser::{
    parse_filter, parse_pattern_directory, parse_pattern_document, parse_pattern_file,
    parse_pattern_yaml,
};
pub use value::{FilterValue, Timespan};
