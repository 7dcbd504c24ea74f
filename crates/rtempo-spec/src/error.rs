use thiserror::Error;

/// Errors that can occur while loading pattern definitions.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Missing required field '{0}'")]
    MissingField(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("Invalid window duration '{0}'")]
    InvalidTimespan(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SpecError>;
