//! Error types for HTTP operations

use std::error::Error as StdError;

use thiserror::Error;

/// Failure to complete a single HTTP exchange
///
/// Non-2xx responses are not errors at this layer; callers inspect the
/// status of the returned response.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Connection, TLS or protocol failure
    #[error("Transport error: {message}")]
    Transport {
        /// Human-readable description
        message: String,
        /// Underlying error
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// The engine gave up waiting for the peer
    #[error("Request timed out: {message}")]
    Timeout {
        /// Human-readable description
        message: String,
    },

    /// The engine was closed before the request was sent
    #[error("HTTP engine has been closed")]
    EngineClosed,

    /// The request could not be built or converted
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An interceptor refused the request
    #[error("Interceptor '{name}' failed: {message}")]
    Interceptor {
        /// Interceptor name
        name: &'static str,
        /// Failure description
        message: String,
    },
}

impl HttpError {
    /// Create a transport error without an underlying source
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Whether a retry strategy may attempt the request again
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                message: err.to_string(),
            }
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Transport {
                message: err.to_string(),
                source: Some(Box::new(err)),
            }
        }
    }
}
