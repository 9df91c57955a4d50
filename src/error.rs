//! Error types for sleeprs
//!
//! Payload problems get their own enum so callers can tell an empty push
//! from a malformed one. `SleepRsError` wraps it together with validation
//! failures on dates and annotations.

use thiserror::Error;

/// Top-level error type for all sleeprs operations
#[derive(Debug, Error)]
pub enum SleepRsError {
    /// Vendor webhook payload errors
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while turning a vendor push payload into records
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The payload carried no entries under the expected key
    #[error("No {field} found in payload")]
    Empty { field: String },

    /// A required field was missing or had the wrong type
    #[error("Malformed {provider} payload: {reason}")]
    Malformed { provider: String, reason: String },

    /// A calendar date could not be parsed as YYYY-MM-DD
    #[error("Invalid calendar date: {value}")]
    InvalidDate { value: String },

    /// An epoch timestamp was outside the representable range
    #[error("Invalid timestamp: {value}")]
    InvalidTimestamp { value: i64 },

    /// Provider name not recognised
    #[error("Unknown provider: {name}")]
    UnknownProvider { name: String },
}

/// Result type alias for sleeprs operations
pub type Result<T> = std::result::Result<T, SleepRsError>;

impl SleepRsError {
    /// How loudly a failed command should report this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SleepRsError::Payload(PayloadError::Empty { .. }) => ErrorSeverity::Warning,
            SleepRsError::Validation(_) => ErrorSeverity::Warning,
            SleepRsError::Payload(_) => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            SleepRsError::Payload(PayloadError::Empty { field }) => {
                format!("The payload did not contain any {}.", field)
            }
            SleepRsError::Payload(PayloadError::Malformed { provider, .. }) => {
                format!("Missing data in {} payload.", provider)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// The command could not produce its output
    Error,
    /// Nothing to show, or input the user can correct
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}
