//! Per-attempt request hooks
//!
//! Interceptors run once per physical attempt, after the retry driver has
//! updated the [`OperationContext`] and before the engine transmits.

mod retry_header;

use std::fmt;

use crate::{HttpError, HttpRequest, OperationContext};

pub use retry_header::{INVOCATION_ID_HEADER, REQUEST_HEADER, RetryHeaderInterceptor};

/// Hook invoked before every physical attempt
pub trait Interceptor: Send + Sync + fmt::Debug {
    /// Name for logs and errors
    fn name(&self) -> &'static str;

    /// Modify the outgoing request
    ///
    /// Returning an error aborts the logical request without further attempts.
    fn modify_before_transmit(
        &self,
        ctx: &OperationContext,
        request: &mut HttpRequest,
    ) -> Result<(), HttpError>;
}
