//! Errors raised while installing the global subscriber

use thiserror::Error;

/// Logging setup failure
#[derive(Debug, Error)]
pub enum LogError {
    /// The filter directive could not be parsed
    #[error("Invalid filter '{filter}': {reason}")]
    Filter {
        /// Directive as configured
        filter: String,
        /// Parser message
        reason: String,
    },

    /// A global subscriber is already installed
    #[error("Logger already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Result alias for logging setup
pub type LogResult<T> = Result<T, LogError>;
