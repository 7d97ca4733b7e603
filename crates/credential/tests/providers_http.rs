//! Network-backed providers against a local mock server

use std::sync::Arc;

use pretty_assertions::assert_eq;
use stratus_credential::providers::{EcsProvider, ImdsProvider, WebIdentityProvider};
use stratus_credential::{ErrorKind, ProvideCredentials, ResolveContext, StaticPlatform};
use stratus_http::{EngineConfig, HttpClient, ReqwestEngine, RetryConfig};
use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(max_attempts: u32) -> HttpClient {
    let engine = ReqwestEngine::new(&EngineConfig::default()).unwrap();
    HttpClient::builder(Arc::new(engine))
        .retry_config(RetryConfig {
            max_attempts,
            initial_backoff: std::time::Duration::from_millis(1),
            max_backoff: std::time::Duration::from_millis(1),
            jitter: false,
        })
        .build()
}

const METADATA_CREDENTIALS: &str = r#"{
    "Code": "Success",
    "Type": "AWS-HMAC",
    "AccessKeyId": "ASIAMOCK",
    "SecretAccessKey": "secret",
    "Token": "session",
    "Expiration": "2099-01-01T00:00:00Z"
}"#;

#[tokio::test]
async fn imds_v2_flow_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/latest/api/token"))
        .and(header("x-aws-ec2-metadata-token-ttl-seconds", "21600"))
        .respond_with(ResponseTemplate::new(200).set_body_string("imds-token"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/latest/meta-data/iam/security-credentials/"))
        .and(header("x-aws-ec2-metadata-token", "imds-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("web-role"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/latest/meta-data/iam/security-credentials/web-role"))
        .and(header("x-aws-ec2-metadata-token", "imds-token"))
        .and(header_exists("amz-sdk-invocation-id"))
        .and(header("amz-sdk-request", "attempt=1; max=3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(METADATA_CREDENTIALS))
        .expect(1)
        .mount(&server)
        .await;

    let platform = StaticPlatform::new().with_env("AWS_EC2_METADATA_SERVICE_ENDPOINT", server.uri());
    let provider = ImdsProvider::new(Arc::new(platform), client(3));

    let creds = provider.resolve(&ResolveContext::new()).await.unwrap();
    assert_eq!(creds.access_key_id(), "ASIAMOCK");
    assert_eq!(creds.provider_name(), Some("Imds"));
}

#[tokio::test]
async fn imds_retries_server_errors_with_attempt_headers() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/latest/api/token"))
        .and(header("amz-sdk-request", "attempt=1; max=2"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/latest/api/token"))
        .and(header("amz-sdk-request", "attempt=2; max=2"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let platform = StaticPlatform::new().with_env("AWS_EC2_METADATA_SERVICE_ENDPOINT", server.uri());
    let provider = ImdsProvider::new(Arc::new(platform), client(2));

    let err = provider.resolve(&ResolveContext::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceFailure);
    assert!(err.to_string().contains("503"), "{err}");
}

#[tokio::test]
async fn container_full_uri_on_loopback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/creds"))
        .and(header("authorization", "Basic c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(METADATA_CREDENTIALS))
        .expect(1)
        .mount(&server)
        .await;

    let platform = StaticPlatform::new()
        .with_env(
            "AWS_CONTAINER_CREDENTIALS_FULL_URI",
            format!("{}/creds", server.uri()),
        )
        .with_env("AWS_CONTAINER_AUTHORIZATION_TOKEN", "Basic c2VjcmV0");
    let provider = EcsProvider::from_env(Arc::new(platform), client(1)).unwrap();

    let creds = provider.resolve(&ResolveContext::new()).await.unwrap();
    assert_eq!(creds.access_key_id(), "ASIAMOCK");
    assert_eq!(creds.provider_name(), Some("EcsContainer"));
}

#[tokio::test]
async fn web_identity_exchange_against_custom_sts_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("Action=AssumeRoleWithWebIdentity"))
        .and(body_string_contains("WebIdentityToken=eyJhbGciOi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"AssumeRoleWithWebIdentityResponse":{"AssumeRoleWithWebIdentityResult":{
                "Credentials":{"AccessKeyId":"ASIASTS","SecretAccessKey":"s",
                "SessionToken":"t","Expiration":4070908800}}}}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let platform = StaticPlatform::new()
        .with_env("AWS_WEB_IDENTITY_TOKEN_FILE", "/var/run/secrets/token")
        .with_env("AWS_ROLE_ARN", "arn:aws:iam::123456789012:role/app")
        .with_env("AWS_ENDPOINT_URL_STS", server.uri())
        .with_file("/var/run/secrets/token", "eyJhbGciOi\n");
    let provider = WebIdentityProvider::from_env(Arc::new(platform), client(1), None).unwrap();

    let creds = provider.resolve(&ResolveContext::new()).await.unwrap();
    assert_eq!(creds.access_key_id(), "ASIASTS");
    assert_eq!(
        creds.expiration().map(|e| e.timestamp()),
        Some(4_070_908_800)
    );
}
