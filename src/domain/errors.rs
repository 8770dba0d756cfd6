//! Domain errors for the transition orchestrator.

use thiserror::Error;

use super::models::RequestId;

/// Errors that end a transition.
///
/// Every variant except [`TransitionError::Cancelled`] and
/// [`TransitionError::Busy`] is fatal: the orchestrator records a failure
/// metric and resets to idle before returning it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Scoring for {request_id} did not complete within {timeout_ms}ms")]
    ScoringTimeout { request_id: RequestId, timeout_ms: u64 },

    #[error("Scoring for {request_id} failed: {message}")]
    ScoringFailed { request_id: RequestId, message: String },

    #[error("Transition {request_id} did not complete within {timeout_ms}ms")]
    TransitionExecutionTimeout { request_id: RequestId, timeout_ms: u64 },

    #[error("Transition {request_id} failed: {message}")]
    TransitionExecutionError { request_id: RequestId, message: String },

    #[error("Transition {current} is already in progress")]
    Busy { current: RequestId },

    #[error("Transition {request_id} was cancelled")]
    Cancelled { request_id: RequestId },
}

impl TransitionError {
    /// Whether this outcome is a failure that gets recorded in metrics.
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Busy { .. } | Self::Cancelled { .. })
    }

    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Request the error belongs to.
    pub const fn request_id(&self) -> RequestId {
        match self {
            Self::ScoringTimeout { request_id, .. }
            | Self::ScoringFailed { request_id, .. }
            | Self::TransitionExecutionTimeout { request_id, .. }
            | Self::TransitionExecutionError { request_id, .. }
            | Self::Cancelled { request_id } => *request_id,
            Self::Busy { current } => *current,
        }
    }
}

pub type DomainResult<T> = Result<T, TransitionError>;

/// Configuration error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "Invalid delay bounds: require min_delay_ms ({min}) <= target_delay_ms ({target}) <= max_delay_ms ({max})"
    )]
    InvalidDelayBounds { min: u64, target: u64, max: u64 },

    #[error("Invalid max_delay_ms: {value} exceeds the {limit}ms ceiling")]
    DelayAboveCeiling { value: u64, limit: u64 },

    #[error("Invalid {field}: must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("Invalid min_success_rate: {0}. Must be between 0.0 and 1.0")]
    InvalidSuccessRate(String),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}
