//! Credentials from the instance metadata service (IMDSv2)
//!
//! A session token is requested first, then the attached role name, then
//! the role's credentials.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use stratus_http::http::{Method, Request, header};
use stratus_http::{HttpClient, HttpRequest, HttpResponse};
use tracing::debug;
use url::Url;

use super::document::CredentialsDocument;
use super::{body_excerpt, header_value};
use crate::core::{Credentials, ResolveContext, ResolveError};
use crate::platform::{Platform, non_empty_env};
use crate::provider::ProvideCredentials;

pub const PROVIDER_NAME: &str = "Imds";

pub const DISABLED: &str = "AWS_EC2_METADATA_DISABLED";
pub const ENDPOINT: &str = "AWS_EC2_METADATA_SERVICE_ENDPOINT";

pub const DEFAULT_ENDPOINT: &str = "http://169.254.169.254";

const TOKEN_PATH: &str = "/latest/api/token";
const CREDENTIALS_PATH: &str = "/latest/meta-data/iam/security-credentials/";
const TOKEN_TTL_HEADER: &str = "x-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "x-aws-ec2-metadata-token";
const TOKEN_TTL_SECONDS: &str = "21600";

/// Fetches the instance role's credentials
#[derive(Debug, Clone)]
pub struct ImdsProvider {
    platform: Arc<dyn Platform>,
    http: HttpClient,
}

impl ImdsProvider {
    pub fn new(platform: Arc<dyn Platform>, http: HttpClient) -> Self {
        Self { platform, http }
    }

    fn endpoint(&self) -> Result<String, ResolveError> {
        let raw = non_empty_env(self.platform.as_ref(), ENDPOINT)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        Url::parse(&raw).map_err(|e| {
            ResolveError::source_failure(PROVIDER_NAME, format!("invalid {ENDPOINT} {raw:?}"))
                .with_source(e)
        })?;
        Ok(raw.trim_end_matches('/').to_string())
    }

    async fn call(
        &self,
        operation: &'static str,
        request: HttpRequest,
    ) -> Result<HttpResponse, ResolveError> {
        let response = self
            .http
            .execute("imds", operation, request)
            .await
            .map_err(|e| {
                ResolveError::source_failure(
                    PROVIDER_NAME,
                    format!("instance metadata {operation} request failed"),
                )
                .with_source(e)
            })?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ResolveError::source_failure(
                PROVIDER_NAME,
                format!(
                    "instance metadata {operation} returned {}: {}",
                    response.status(),
                    body_excerpt(&response)
                ),
            ))
        }
    }

    async fn session_token(&self, endpoint: &str) -> Result<String, ResolveError> {
        let request = build(
            Request::builder()
                .method(Method::PUT)
                .uri(format!("{endpoint}{TOKEN_PATH}"))
                .header(TOKEN_TTL_HEADER, TOKEN_TTL_SECONDS),
        )?;
        let response = self.call("GetToken", request).await?;
        let token = String::from_utf8_lossy(response.body()).trim().to_string();
        if token.is_empty() {
            return Err(ResolveError::source_failure(
                PROVIDER_NAME,
                "instance metadata returned an empty session token",
            ));
        }
        Ok(token)
    }

    async fn get_with_token(
        &self,
        operation: &'static str,
        uri: String,
        token: &str,
    ) -> Result<HttpResponse, ResolveError> {
        let token = header_value(token).ok_or_else(|| {
            ResolveError::source_failure(PROVIDER_NAME, "session token is not a valid header value")
        })?;
        let request = build(
            Request::builder()
                .method(Method::GET)
                .uri(uri)
                .header(TOKEN_HEADER, token),
        )?;
        self.call(operation, request).await
    }
}

fn build(builder: stratus_http::http::request::Builder) -> Result<HttpRequest, ResolveError> {
    builder
        .header(header::ACCEPT, "*/*")
        .body(Bytes::new())
        .map_err(|e| {
            ResolveError::source_failure(PROVIDER_NAME, "failed to build request").with_source(e)
        })
}

fn is_disabled(platform: &dyn Platform) -> bool {
    non_empty_env(platform, DISABLED).is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

#[async_trait]
impl ProvideCredentials for ImdsProvider {
    async fn resolve(&self, _ctx: &ResolveContext) -> Result<Credentials, ResolveError> {
        if is_disabled(self.platform.as_ref()) {
            return Err(ResolveError::not_applicable(
                PROVIDER_NAME,
                format!("disabled by {DISABLED}"),
            ));
        }

        let endpoint = self.endpoint()?;
        let token = self.session_token(&endpoint).await?;

        let roles = self
            .get_with_token("GetRoleName", format!("{endpoint}{CREDENTIALS_PATH}"), &token)
            .await?;
        let listing = String::from_utf8_lossy(roles.body()).to_string();
        let Some(role) = listing.lines().map(str::trim).find(|line| !line.is_empty()) else {
            return Err(ResolveError::source_failure(
                PROVIDER_NAME,
                "no IAM role is attached to this instance",
            ));
        };
        debug!(provider = PROVIDER_NAME, role, "Fetching instance role credentials");

        let response = self
            .get_with_token(
                "GetCredentials",
                format!("{endpoint}{CREDENTIALS_PATH}{role}"),
                &token,
            )
            .await?;
        let document: CredentialsDocument =
            serde_json::from_slice(response.body()).map_err(|e| {
                ResolveError::source_failure(PROVIDER_NAME, "malformed instance credentials")
                    .with_source(e)
            })?;
        document.into_credentials(PROVIDER_NAME)
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::platform::StaticPlatform;
    use pretty_assertions::assert_eq;
    use stratus_http::testing::TestEngine;

    #[tokio::test]
    async fn test_disabled_is_not_applicable_without_network() {
        let engine = Arc::new(TestEngine::new());
        let platform = Arc::new(StaticPlatform::new().with_env(DISABLED, "TRUE"));
        let provider = ImdsProvider::new(platform, HttpClient::new(engine.clone()));

        let err = provider.resolve(&ResolveContext::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotApplicable);
        assert_eq!(engine.request_count(), 0);
    }

    #[tokio::test]
    async fn test_token_role_credentials_sequence() {
        let engine = Arc::new(TestEngine::new());
        engine.push_status(200, "session-token");
        engine.push_status(200, "app-role\n");
        engine.push_status(
            200,
            r#"{"Code":"Success","AccessKeyId":"ASIAIMDS","SecretAccessKey":"s","Token":"t","Expiration":"2026-10-16T16:00:00Z"}"#,
        );
        let provider = ImdsProvider::new(
            Arc::new(StaticPlatform::new()),
            HttpClient::new(engine.clone()),
        );

        let creds = provider.resolve(&ResolveContext::new()).await.unwrap();
        assert_eq!(creds.access_key_id(), "ASIAIMDS");

        let requests = engine.requests();
        let calls: Vec<(String, String)> = requests
            .iter()
            .map(|r| (r.method().to_string(), r.uri().to_string()))
            .collect();
        assert_eq!(
            calls,
            vec![
                ("PUT".to_string(), "http://169.254.169.254/latest/api/token".to_string()),
                (
                    "GET".to_string(),
                    "http://169.254.169.254/latest/meta-data/iam/security-credentials/".to_string()
                ),
                (
                    "GET".to_string(),
                    "http://169.254.169.254/latest/meta-data/iam/security-credentials/app-role"
                        .to_string()
                ),
            ]
        );
        assert_eq!(requests[0].headers().get(TOKEN_TTL_HEADER).unwrap(), "21600");
        assert_eq!(requests[2].headers().get(TOKEN_HEADER).unwrap(), "session-token");
    }

    #[tokio::test]
    async fn test_missing_role_is_source_failure() {
        let engine = Arc::new(TestEngine::new());
        engine.push_status(200, "session-token");
        engine.push_status(200, "");
        let provider = ImdsProvider::new(Arc::new(StaticPlatform::new()), HttpClient::new(engine));

        let err = provider.resolve(&ResolveContext::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceFailure);
        assert!(err.to_string().contains("no IAM role"));
    }
}
