//! Per logical request execution context

use std::borrow::Cow;

use uuid::Uuid;

/// Attempt bookkeeping written by the retry driver before each physical attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// 1-based physical attempt number
    pub attempt: u32,
    /// Configured maximum number of attempts
    pub max_attempts: u32,
}

/// State shared by every physical attempt of one logical request
///
/// The invocation id is generated once, when the context is created, and
/// stays constant across retries.
#[derive(Debug, Clone)]
pub struct OperationContext {
    invocation_id: String,
    service: Cow<'static, str>,
    operation: Cow<'static, str>,
    retry: Option<RetryState>,
}

impl OperationContext {
    /// Start a new logical request
    pub fn new(service: impl Into<Cow<'static, str>>, operation: impl Into<Cow<'static, str>>) -> Self {
        Self {
            invocation_id: Uuid::new_v4().to_string(),
            service: service.into(),
            operation: operation.into(),
            retry: None,
        }
    }

    /// Override the generated invocation id (builder pattern)
    pub fn with_invocation_id(mut self, invocation_id: impl Into<String>) -> Self {
        self.invocation_id = invocation_id.into();
        self
    }

    /// Identifier shared by all attempts of this request
    pub fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    /// Service name, for logs
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Operation name, for logs
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Retry state of the attempt in progress, if a retry driver is active
    pub fn retry_state(&self) -> Option<RetryState> {
        self.retry
    }

    /// Record the attempt about to be transmitted
    pub fn set_retry_state(&mut self, state: Option<RetryState>) {
        self.retry = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_id_is_unique_per_context() {
        let first = OperationContext::new("sts", "AssumeRoleWithWebIdentity");
        let second = OperationContext::new("sts", "AssumeRoleWithWebIdentity");
        assert_ne!(first.invocation_id(), second.invocation_id());
        assert!(Uuid::parse_str(first.invocation_id()).is_ok());
    }

    #[test]
    fn test_clone_keeps_invocation_id() {
        let mut ctx = OperationContext::new("imds", "GetToken").with_invocation_id("fixed-id");
        ctx.set_retry_state(Some(RetryState {
            attempt: 2,
            max_attempts: 3,
        }));
        let cloned = ctx.clone();
        assert_eq!(cloned.invocation_id(), "fixed-id");
        assert_eq!(cloned.retry_state().map(|s| s.attempt), Some(2));
        assert_eq!(cloned.service(), "imds");
        assert_eq!(cloned.operation(), "GetToken");
    }
}
