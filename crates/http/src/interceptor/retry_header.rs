//! Invocation id and attempt headers
//!
//! Every physical attempt carries:
//!
//! - `amz-sdk-invocation-id: <id>`: constant for the logical request
//! - `amz-sdk-request: attempt=<n>; max=<m>`: 1-based attempt and the
//!   configured maximum

use http::HeaderValue;
use http::header::HeaderName;
use tracing::warn;

use super::Interceptor;
use crate::{HttpError, HttpRequest, OperationContext};

/// Header carrying the per logical request identifier
pub const INVOCATION_ID_HEADER: &str = "amz-sdk-invocation-id";

/// Header carrying `attempt=<n>; max=<m>`
pub const REQUEST_HEADER: &str = "amz-sdk-request";

/// Stamps invocation id and attempt ordinal on each attempt
///
/// Outside a retrying operation (no retry state in the context) the attempt
/// header reads `attempt=1; max=1`. This interceptor never fails a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryHeaderInterceptor;

impl RetryHeaderInterceptor {
    /// Create the interceptor
    pub fn new() -> Self {
        Self
    }

    /// Attempt header value for the given context
    pub fn attempt_value(ctx: &OperationContext) -> String {
        let (attempt, max) = ctx
            .retry_state()
            .map_or((1, 1), |state| (state.attempt, state.max_attempts));
        format!("attempt={attempt}; max={max}")
    }
}

impl Interceptor for RetryHeaderInterceptor {
    fn name(&self) -> &'static str {
        "retry-header"
    }

    fn modify_before_transmit(
        &self,
        ctx: &OperationContext,
        request: &mut HttpRequest,
    ) -> Result<(), HttpError> {
        let headers = request.headers_mut();

        match HeaderValue::from_str(ctx.invocation_id()) {
            Ok(value) => {
                headers.insert(HeaderName::from_static(INVOCATION_ID_HEADER), value);
            }
            Err(_) => warn!(
                invocation_id = ctx.invocation_id(),
                "invocation id is not a valid header value, skipping"
            ),
        }

        if let Ok(value) = HeaderValue::from_str(&Self::attempt_value(ctx)) {
            headers.insert(HeaderName::from_static(REQUEST_HEADER), value);
        }

        Ok(())
    }
}
