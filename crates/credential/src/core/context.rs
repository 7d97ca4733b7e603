//! Resolution request context
//!
//! Carries tracing metadata for one `resolve` call. Providers borrow it for
//! the duration of the call only.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Request context for credential resolution
///
/// # Examples
///
/// ```
/// use stratus_credential::ResolveContext;
/// use uuid::Uuid;
///
/// let trace_id = Uuid::new_v4();
/// let ctx = ResolveContext::new().with_trace_id(trace_id);
/// assert_eq!(ctx.trace_id, trace_id);
/// ```
#[derive(Debug, Clone)]
pub struct ResolveContext {
    /// Trace ID for distributed tracing
    pub trace_id: Uuid,

    /// Timestamp of the request
    pub timestamp: DateTime<Utc>,
}

impl ResolveContext {
    /// Create a new context with a fresh trace id
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }

    /// Set trace ID for this context (builder pattern)
    pub fn with_trace_id(mut self, trace_id: Uuid) -> Self {
        self.trace_id = trace_id;
        self
    }
}

impl Default for ResolveContext {
    fn default() -> Self {
        Self::new()
    }
}
