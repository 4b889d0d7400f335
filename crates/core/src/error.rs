//! Error types for the ecosim profile and aggregation core.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the ecosim core.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Profile input could not be parsed or its format could not be detected.
    #[error("Profile format error: {0}")]
    ProfileFormat(String),

    /// A profile violates the validated-profile invariants.
    #[error("Profile validation error: {0}")]
    ProfileValidation(String),

    /// Aggregation window slot count mismatch or discontinuity.
    #[error("Aggregation consistency error: {0}")]
    AggregationConsistency(String),

    /// Insufficient data for computation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a profile format error.
    pub fn profile_format(msg: impl Into<String>) -> Self {
        Error::ProfileFormat(msg.into())
    }

    /// Create a profile validation error.
    pub fn profile_validation(msg: impl Into<String>) -> Self {
        Error::ProfileValidation(msg.into())
    }

    /// Create an aggregation consistency error.
    pub fn aggregation_consistency(msg: impl Into<String>) -> Self {
        Error::AggregationConsistency(msg.into())
    }

    /// Create an insufficient data error.
    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Error::InsufficientData(msg.into())
    }

    /// Whether this error signals corrupted aggregation input.
    pub fn is_aggregation_consistency(&self) -> bool {
        matches!(self, Error::AggregationConsistency(_))
    }

    /// Whether this error signals unparseable profile input.
    pub fn is_profile_format(&self) -> bool {
        matches!(self, Error::ProfileFormat(_))
    }
}
