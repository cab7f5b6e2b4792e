//! Error types for the Kolosal search engine

use thiserror::Error;

/// Result type alias for Kolosal search operations
pub type Result<T> = std::result::Result<T, KolosalError>;

/// Main error type for the search engine
#[derive(Error, Debug)]
pub enum KolosalError {
    #[error("No such pipeline allowed in this AutoML search: {0}")]
    PipelineNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("No parameters left to propose: {0}")]
    NoParams(String),

    #[error("AutoML algorithm error: {0}")]
    AlgorithmError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<serde_json::Error> for KolosalError {
    fn from(err: serde_json::Error) -> Self {
        KolosalError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for KolosalError {
    fn from(err: ndarray::ShapeError) -> Self {
        KolosalError::ComputationError(err.to_string())
    }
}
