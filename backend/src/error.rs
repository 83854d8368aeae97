//! Error types for report queries.
//!
//! Per-central transport failures are deliberately absent here: they are
//! recorded as [`CentralFailure`](crate::models::CentralFailure) values and
//! never abort a query.

use crate::services::guard::GuardRejection;

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;

/// Error type for report operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    /// Query parameters rejected before any network activity.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Another report run is still in flight.
    #[error("A report run is already in progress")]
    Busy,

    /// The query repeats the most recently completed run.
    #[error("Duplicate query: {key}")]
    Duplicate { key: String },

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unexpected failure while merging or building rows.
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl ReportError {
    /// Create an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a pipeline error.
    pub fn pipeline(message: impl Into<String>) -> Self {
        Self::Pipeline(message.into())
    }

    /// Whether the concurrency guard refused to start the run.
    pub fn is_guard_rejection(&self) -> bool {
        matches!(self, Self::Busy | Self::Duplicate { .. })
    }
}

impl From<GuardRejection> for ReportError {
    fn from(rejection: GuardRejection) -> Self {
        match rejection {
            GuardRejection::Busy => ReportError::Busy,
            GuardRejection::Duplicate(key) => ReportError::Duplicate { key },
        }
    }
}
