//! Error types for credential resolution
//!
//! [`ResolveError`] is `Clone` so a single failed resolution can be fanned
//! out to every caller coalesced onto it.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::Write as _;
use std::sync::Arc;

use stratus_http::HttpError;
use thiserror::Error;

/// Coarse classification of a [`ResolveError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The source has no configuration in this environment
    NotApplicable,
    /// The source is configured but failed
    SourceFailure,
    /// Every source of a chain failed
    ChainExhausted,
    /// A cached refresh failed
    RefreshFailed,
    /// The resolver was closed
    Closed,
}

/// One provider's failure inside an exhausted chain
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    /// Name of the provider that was tried
    pub provider: String,
    /// Why it did not produce credentials
    pub error: ResolveError,
}

/// Credential resolution errors
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The source is not configured here (e.g. required variables are absent)
    #[error("{provider}: not configured: {reason}")]
    NotApplicable {
        provider: Cow<'static, str>,
        reason: String,
    },

    /// The source is configured but failed (network, parse, remote rejection)
    #[error("{provider}: {message}")]
    SourceFailure {
        provider: Cow<'static, str>,
        message: String,
        #[source]
        source: Option<Arc<dyn StdError + Send + Sync>>,
    },

    /// Every provider of a chain failed; attempts are kept in chain order
    #[error("no credentials could be resolved from the chain: {}", render_attempts(.attempts))]
    ChainExhausted { attempts: Vec<ProviderAttempt> },

    /// A cached refresh failed and no valid cached value exists
    #[error("credentials refresh failed: {source}")]
    RefreshFailed {
        #[source]
        source: Arc<ResolveError>,
    },

    /// The resolver has been closed
    #[error("credentials resolver is closed")]
    Closed,
}

fn render_attempts(attempts: &[ProviderAttempt]) -> String {
    if attempts.is_empty() {
        return "no providers configured".to_string();
    }

    let mut out = String::new();
    for (index, attempt) in attempts.iter().enumerate() {
        if index > 0 {
            out.push_str("; ");
        }
        let _ = write!(out, "[{}] {}", index + 1, attempt.error);
    }
    out
}

impl ResolveError {
    /// Source is not configured in this environment
    pub fn not_applicable(
        provider: impl Into<Cow<'static, str>>,
        reason: impl Into<String>,
    ) -> Self {
        Self::NotApplicable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Source is configured but failed
    pub fn source_failure(
        provider: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> Self {
        Self::SourceFailure {
            provider: provider.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Attach an underlying cause to a `SourceFailure`
    ///
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn with_source<E>(self, error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        match self {
            Self::SourceFailure {
                provider, message, ..
            } => Self::SourceFailure {
                provider,
                message,
                source: Some(Arc::new(error)),
            },
            other => other,
        }
    }

    /// Re-attribute a provider-level error to another provider name
    #[must_use]
    pub fn for_provider(self, name: impl Into<Cow<'static, str>>) -> Self {
        match self {
            Self::NotApplicable { reason, .. } => Self::NotApplicable {
                provider: name.into(),
                reason,
            },
            Self::SourceFailure {
                message, source, ..
            } => Self::SourceFailure {
                provider: name.into(),
                message,
                source,
            },
            other => other,
        }
    }

    /// Classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotApplicable { .. } => ErrorKind::NotApplicable,
            Self::SourceFailure { .. } => ErrorKind::SourceFailure,
            Self::ChainExhausted { .. } => ErrorKind::ChainExhausted,
            Self::RefreshFailed { .. } => ErrorKind::RefreshFailed,
            Self::Closed => ErrorKind::Closed,
        }
    }

    /// Whether the source simply was not configured
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Self::NotApplicable { .. })
    }

    /// Provider this error is attributed to, if any
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::NotApplicable { provider, .. } | Self::SourceFailure { provider, .. } => {
                Some(provider.as_ref())
            }
            _ => None,
        }
    }

    /// Per-provider attempts of an exhausted chain
    ///
    /// Looks through `RefreshFailed` so callers of a cached chain see the
    /// same attempts as callers of the bare chain.
    pub fn attempts(&self) -> &[ProviderAttempt] {
        match self {
            Self::ChainExhausted { attempts } => attempts,
            Self::RefreshFailed { source } => source.attempts(),
            _ => &[],
        }
    }
}

/// Configuration errors raised while building resolvers
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration value is out of range
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// The HTTP engine could not be created
    #[error("Failed to create HTTP engine: {0}")]
    Engine(#[from] HttpError),
}
