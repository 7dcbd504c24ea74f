//! Engine error types.

use thiserror::Error;

/// Errors that can occur during pattern compilation or state access.
#[derive(Debug, Error)]
pub enum EvalError {
    /// No temporal state exists for the pattern id.
    #[error("pattern not found: {0}")]
    PatternNotFound(String),

    /// The pattern specification is malformed (empty steps, zero window or
    /// threshold, uncompilable regex).
    #[error("invalid pattern specification: {0}")]
    InvalidSpec(String),

    /// A pattern with this id already has temporal state.
    #[error("pattern already exists: {0}")]
    AlreadyExists(String),

    /// A state of one pattern kind was stored under a pattern of another kind.
    #[error("state kind does not match pattern kind for: {0}")]
    StateMismatch(String),

    /// A definition loading error propagated from `rtempo-spec`.
    #[error("spec error: {0}")]
    Spec(#[from] rtempo_spec::SpecError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, EvalError>;
