//! HTTP client: retry driver + interceptors over a shared engine

use std::sync::Arc;

use tracing::debug;

use crate::engine::clone_request;
use crate::{
    HttpEngine, HttpError, HttpRequest, HttpResponse, Interceptor, OperationContext, RetryConfig,
    RetryDecision, RetryHeaderInterceptor, RetryState, StandardRetryStrategy,
};

/// Executes logical requests as one or more physical attempts
///
/// Cloning is cheap; clones share the engine and interceptor list.
#[derive(Debug, Clone)]
pub struct HttpClient {
    engine: Arc<dyn HttpEngine>,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    retry: StandardRetryStrategy,
}

impl HttpClient {
    /// Client with the default retry strategy and [`RetryHeaderInterceptor`]
    pub fn new(engine: Arc<dyn HttpEngine>) -> Self {
        Self::builder(engine).build()
    }

    /// Start building a client over `engine`
    pub fn builder(engine: Arc<dyn HttpEngine>) -> HttpClientBuilder {
        HttpClientBuilder {
            engine,
            interceptors: vec![Arc::new(RetryHeaderInterceptor)],
            retry: RetryConfig::default(),
        }
    }

    /// Underlying engine
    pub fn engine(&self) -> &Arc<dyn HttpEngine> {
        &self.engine
    }

    /// Active retry strategy
    pub fn retry_strategy(&self) -> &StandardRetryStrategy {
        &self.retry
    }

    /// Send `request` as a new logical operation
    pub async fn execute(
        &self,
        service: &'static str,
        operation: &'static str,
        request: HttpRequest,
    ) -> Result<HttpResponse, HttpError> {
        let mut ctx = OperationContext::new(service, operation);
        self.send(&mut ctx, request).await
    }

    /// Send `request` within an existing logical operation
    ///
    /// Before each attempt the context's retry state is updated and every
    /// interceptor runs against a fresh copy of `request`. The last outcome
    /// is returned once the strategy stops or attempts are exhausted.
    pub async fn send(
        &self,
        ctx: &mut OperationContext,
        request: HttpRequest,
    ) -> Result<HttpResponse, HttpError> {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 1;

        loop {
            ctx.set_retry_state(Some(RetryState {
                attempt,
                max_attempts,
            }));

            let mut outgoing = clone_request(&request);
            for interceptor in self.interceptors.iter() {
                interceptor.modify_before_transmit(ctx, &mut outgoing)?;
            }

            let outcome = self.engine.send(outgoing).await;

            if attempt >= max_attempts || self.retry.classify(&outcome) == RetryDecision::Stop {
                return outcome;
            }

            let delay = self.retry.backoff(attempt);
            debug!(
                service = ctx.service(),
                operation = ctx.operation(),
                invocation_id = ctx.invocation_id(),
                attempt,
                max_attempts,
                ?delay,
                "retrying request"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }
}

/// Builder for [`HttpClient`]
#[derive(Debug)]
pub struct HttpClientBuilder {
    engine: Arc<dyn HttpEngine>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    retry: RetryConfig,
}

impl HttpClientBuilder {
    /// Append an interceptor; interceptors run in insertion order
    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Remove all interceptors, including the default retry-header one
    pub fn clear_interceptors(mut self) -> Self {
        self.interceptors.clear();
        self
    }

    /// Retry configuration
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Finish building
    pub fn build(self) -> HttpClient {
        HttpClient {
            engine: self.engine,
            interceptors: self.interceptors.into(),
            retry: StandardRetryStrategy::new(self.retry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestEngine;
    use crate::{INVOCATION_ID_HEADER, REQUEST_HEADER};
    use bytes::Bytes;
    use std::time::Duration;

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            jitter: false,
        }
    }

    fn get() -> HttpRequest {
        http::Request::get("http://localhost/resource")
            .body(Bytes::new())
            .unwrap()
    }

    #[tokio::test]
    async fn test_success_is_single_attempt() {
        let engine = Arc::new(TestEngine::new());
        let client = HttpClient::builder(engine.clone())
            .retry_config(fast_retry(3))
            .build();

        let response = client.execute("svc", "Op", get()).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(engine.request_count(), 1);
    }

    #[tokio::test]
    async fn test_stops_after_max_attempts() {
        let engine = Arc::new(TestEngine::new());
        for _ in 0..5 {
            engine.push_status(503, "");
        }
        let client = HttpClient::builder(engine.clone())
            .retry_config(fast_retry(3))
            .build();

        let response = client.execute("svc", "Op", get()).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(engine.request_count(), 3);
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_retry_event_logs_backoff_duration() {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        let engine = Arc::new(TestEngine::new());
        engine.push_status(503, "");
        let client = HttpClient::builder(engine.clone())
            .retry_config(fast_retry(2))
            .build();
        client.execute("svc", "Op", get()).await.unwrap();

        let logged = String::from_utf8(buffer.0.lock().clone()).unwrap();
        assert!(logged.contains("retrying request"), "{logged}");
        assert!(logged.contains("delay=0ns"), "{logged}");
        assert!(!logged.contains("delay_ms"), "{logged}");
    }

    #[tokio::test]
    async fn test_context_tracks_last_attempt() {
        let engine = Arc::new(TestEngine::new());
        engine.push_error(HttpError::transport("reset"));
        let client = HttpClient::builder(engine.clone())
            .retry_config(fast_retry(4))
            .build();

        let mut ctx = OperationContext::new("svc", "Op");
        client.send(&mut ctx, get()).await.unwrap();
        assert_eq!(
            ctx.retry_state(),
            Some(RetryState {
                attempt: 2,
                max_attempts: 4
            })
        );
    }

    #[tokio::test]
    async fn test_cleared_interceptors_send_no_headers() {
        let engine = Arc::new(TestEngine::new());
        let client = HttpClient::builder(engine.clone())
            .clear_interceptors()
            .build();

        client.execute("svc", "Op", get()).await.unwrap();
        let sent = engine.requests();
        assert!(sent[0].headers().get(INVOCATION_ID_HEADER).is_none());
        assert!(sent[0].headers().get(REQUEST_HEADER).is_none());
    }

    #[derive(Debug)]
    struct Refuse;

    impl Interceptor for Refuse {
        fn name(&self) -> &'static str {
            "refuse"
        }

        fn modify_before_transmit(
            &self,
            _ctx: &OperationContext,
            _request: &mut HttpRequest,
        ) -> Result<(), HttpError> {
            Err(HttpError::Interceptor {
                name: self.name(),
                message: "nope".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_interceptor_error_aborts_without_sending() {
        let engine = Arc::new(TestEngine::new());
        let client = HttpClient::builder(engine.clone())
            .interceptor(Refuse)
            .build();

        let err = client.execute("svc", "Op", get()).await.unwrap_err();
        assert!(matches!(err, HttpError::Interceptor { name: "refuse", .. }));
        assert_eq!(engine.request_count(), 0);
    }
}
