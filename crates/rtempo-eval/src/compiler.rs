//! Compilation of pattern specifications.
//!
//! Validates a [`PatternSpec`] and compiles its filters. Compiled patterns are
//! immutable and shared read-only by every delivery to that pattern.

use rtempo_spec::{PatternKind, PatternSpec};

use crate::error::{EvalError, Result};
use crate::filter::{CompiledFilter, compile_filter};

/// Compiled form of a [`PatternSpec`].
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    Sequence(SequencePattern),
    Frequency(FrequencyPattern),
    Correlation(CorrelationPattern),
}

#[derive(Debug, Clone)]
pub struct SequencePattern {
    pub steps: Vec<CompiledFilter>,
    pub window_ms: i64,
}

#[derive(Debug, Clone)]
pub struct FrequencyPattern {
    pub filter: CompiledFilter,
    pub threshold: usize,
    pub window_ms: i64,
}

#[derive(Debug, Clone)]
pub struct CorrelationPattern {
    pub trigger: CompiledFilter,
    pub response: CompiledFilter,
    pub window_ms: i64,
}

impl CompiledPattern {
    pub fn kind(&self) -> PatternKind {
        match self {
            CompiledPattern::Sequence(_) => PatternKind::Sequence,
            CompiledPattern::Frequency(_) => PatternKind::Frequency,
            CompiledPattern::Correlation(_) => PatternKind::Correlation,
        }
    }

    pub fn window_ms(&self) -> i64 {
        match self {
            CompiledPattern::Sequence(p) => p.window_ms,
            CompiledPattern::Frequency(p) => p.window_ms,
            CompiledPattern::Correlation(p) => p.window_ms,
        }
    }
}

/// Validate and compile a pattern specification.
///
/// Nothing is registered anywhere; a failure leaves no trace.
pub fn compile_pattern(spec: &PatternSpec) -> Result<CompiledPattern> {
    let window_ms = validate_window(spec.window_ms())?;

    Ok(match spec {
        PatternSpec::Sequence { steps, .. } => {
            if steps.is_empty() {
                return Err(EvalError::InvalidSpec(
                    "sequence requires at least one step".to_string(),
                ));
            }
            let steps = steps
                .iter()
                .enumerate()
                .map(|(i, step)| {
                    compile_filter(step).map_err(|e| match e {
                        EvalError::InvalidSpec(msg) => {
                            EvalError::InvalidSpec(format!("step {}: {msg}", i + 1))
                        }
                        other => other,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            CompiledPattern::Sequence(SequencePattern { steps, window_ms })
        }
        PatternSpec::Frequency {
            filter, threshold, ..
        } => {
            if *threshold == 0 {
                return Err(EvalError::InvalidSpec(
                    "frequency threshold must be at least 1".to_string(),
                ));
            }
            let threshold = usize::try_from(*threshold).map_err(|_| {
                EvalError::InvalidSpec(format!("frequency threshold {threshold} is too large"))
            })?;
            CompiledPattern::Frequency(FrequencyPattern {
                filter: compile_filter(filter)?,
                threshold,
                window_ms,
            })
        }
        PatternSpec::Correlation {
            trigger, response, ..
        } => CompiledPattern::Correlation(CorrelationPattern {
            trigger: compile_filter(trigger)?,
            response: compile_filter(response)?,
            window_ms,
        }),
    })
}

fn validate_window(window_ms: u64) -> Result<i64> {
    if window_ms == 0 {
        return Err(EvalError::InvalidSpec(
            "window must be greater than zero".to_string(),
        ));
    }
    i64::try_from(window_ms)
        .map_err(|_| EvalError::InvalidSpec(format!("window of {window_ms}ms is too large")))
}
