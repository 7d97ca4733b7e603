//! Invocation id / attempt header behaviour across retries

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use pretty_assertions::assert_eq;
use stratus_http::testing::TestEngine;
use stratus_http::{
    HttpClient, HttpError, INVOCATION_ID_HEADER, OperationContext, REQUEST_HEADER, RetryConfig,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
        jitter: false,
    }
}

fn request() -> http::Request<Bytes> {
    http::Request::put("http://localhost/object")
        .body(Bytes::from_static(b"data"))
        .unwrap()
}

fn header_value(req: &http::Request<Bytes>, name: &str) -> String {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn test_attempts_share_invocation_id_and_count_up() {
    let engine = Arc::new(TestEngine::new());
    engine.push_status(500, "");
    engine.push_error(HttpError::transport("connection reset"));
    engine.push_status(200, "ok");

    let client = HttpClient::builder(engine.clone())
        .retry_config(retry(3))
        .build();
    let mut ctx = OperationContext::new("s3", "PutObject");

    let response = client.send(&mut ctx, request()).await.unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);

    let sent = engine.requests();
    assert_eq!(sent.len(), 3);
    for (idx, req) in sent.iter().enumerate() {
        assert_eq!(header_value(req, INVOCATION_ID_HEADER), ctx.invocation_id());
        assert_eq!(
            header_value(req, REQUEST_HEADER),
            format!("attempt={}; max=3", idx + 1)
        );
    }
}

#[tokio::test]
async fn test_non_retryable_status_is_single_attempt() {
    let engine = Arc::new(TestEngine::new());
    engine.push_status(403, "denied");

    let client = HttpClient::builder(engine.clone())
        .retry_config(retry(5))
        .build();
    let response = client.execute("sts", "GetCallerIdentity", request()).await.unwrap();

    assert_eq!(response.status(), http::StatusCode::FORBIDDEN);
    let sent = engine.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(header_value(&sent[0], REQUEST_HEADER), "attempt=1; max=5");
}

#[tokio::test]
async fn test_separate_logical_requests_get_distinct_ids() {
    let engine = Arc::new(TestEngine::new());
    let client = HttpClient::builder(engine.clone())
        .retry_config(retry(2))
        .build();

    for _ in 0..4 {
        client.execute("svc", "Op", request()).await.unwrap();
    }

    let ids: HashSet<String> = engine
        .requests()
        .iter()
        .map(|req| header_value(req, INVOCATION_ID_HEADER))
        .collect();
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn test_headers_reach_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest"))
        .and(header(REQUEST_HEADER, "attempt=1; max=2"))
        .and(header(INVOCATION_ID_HEADER, "wire-test-id"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let engine = Arc::new(
        stratus_http::ReqwestEngine::new(&stratus_http::EngineConfig::default()).unwrap(),
    );
    let client = HttpClient::builder(engine).retry_config(retry(2)).build();
    let mut ctx = OperationContext::new("imds", "Probe").with_invocation_id("wire-test-id");
    let request = http::Request::get(format!("{}/latest", server.uri()))
        .body(Bytes::new())
        .unwrap();

    let response = client.send(&mut ctx, request).await.unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);
}
