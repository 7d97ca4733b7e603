//! Credentials from a web identity token exchanged with STS
//!
//! The token file is re-read on every resolution because orchestrators
//! rotate it in place.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use stratus_http::HttpClient;
use stratus_http::http::{Method, Request, header};
use tracing::debug;
use url::Url;

use super::body_excerpt;
use super::document::CredentialsDocument;
use crate::core::{Credentials, ResolveContext, ResolveError};
use crate::platform::{Platform, env_region, non_empty_env};
use crate::provider::ProvideCredentials;

pub const PROVIDER_NAME: &str = "WebIdentityToken";

pub const TOKEN_FILE: &str = "AWS_WEB_IDENTITY_TOKEN_FILE";
pub const ROLE_ARN: &str = "AWS_ROLE_ARN";
pub const ROLE_SESSION_NAME: &str = "AWS_ROLE_SESSION_NAME";
pub const STS_ENDPOINT: &str = "AWS_ENDPOINT_URL_STS";

const STS_GLOBAL_ENDPOINT: &str = "https://sts.amazonaws.com/";
const STS_API_VERSION: &str = "2011-06-15";

/// Role, token location and session name for a web identity exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebIdentityConfig {
    pub token_file: PathBuf,
    pub role_arn: String,
    pub session_name: Option<String>,
}

impl WebIdentityConfig {
    /// Read `AWS_WEB_IDENTITY_TOKEN_FILE`, `AWS_ROLE_ARN` and `AWS_ROLE_SESSION_NAME`
    pub fn from_env(platform: &dyn Platform) -> Result<Self, ResolveError> {
        let token_file = non_empty_env(platform, TOKEN_FILE);
        let role_arn = non_empty_env(platform, ROLE_ARN);

        match (token_file, role_arn) {
            (Some(token_file), Some(role_arn)) => Ok(Self {
                token_file: PathBuf::from(token_file),
                role_arn,
                session_name: non_empty_env(platform, ROLE_SESSION_NAME),
            }),
            (None, None) => Err(ResolveError::not_applicable(
                PROVIDER_NAME,
                format!("{TOKEN_FILE} and {ROLE_ARN} are not set"),
            )),
            (Some(_), None) => Err(ResolveError::source_failure(
                PROVIDER_NAME,
                format!("{TOKEN_FILE} is set but {ROLE_ARN} is not"),
            )),
            (None, Some(_)) => Err(ResolveError::source_failure(
                PROVIDER_NAME,
                format!("{ROLE_ARN} is set but {TOKEN_FILE} is not"),
            )),
        }
    }
}

/// Exchanges a web identity token for temporary credentials
#[derive(Debug, Clone)]
pub struct WebIdentityProvider {
    config: WebIdentityConfig,
    sts: StsClient,
    platform: Arc<dyn Platform>,
}

impl WebIdentityProvider {
    pub fn new(
        config: WebIdentityConfig,
        platform: Arc<dyn Platform>,
        http: HttpClient,
        region: Option<&str>,
    ) -> Result<Self, ResolveError> {
        let sts = StsClient::new(http, platform.as_ref(), region, PROVIDER_NAME)?;
        Ok(Self {
            config,
            sts,
            platform,
        })
    }

    /// Build from the process environment
    ///
    /// Fails with `NotApplicable` when the token file and role are not configured.
    pub fn from_env(
        platform: Arc<dyn Platform>,
        http: HttpClient,
        region: Option<String>,
    ) -> Result<Self, ResolveError> {
        let config = WebIdentityConfig::from_env(platform.as_ref())?;
        let region = region.or_else(|| env_region(platform.as_ref()));
        Self::new(config, platform, http, region.as_deref())
    }

    pub fn config(&self) -> &WebIdentityConfig {
        &self.config
    }
}

#[async_trait]
impl ProvideCredentials for WebIdentityProvider {
    async fn resolve(&self, _ctx: &ResolveContext) -> Result<Credentials, ResolveError> {
        let token = self
            .platform
            .read_file(&self.config.token_file)
            .await
            .map_err(|e| {
                ResolveError::source_failure(
                    PROVIDER_NAME,
                    format!(
                        "failed to read web identity token from {}",
                        self.config.token_file.display()
                    ),
                )
                .with_source(e)
            })?;

        let session_name = self
            .config
            .session_name
            .clone()
            .unwrap_or_else(default_session_name);

        self.sts
            .assume_role_with_web_identity(&self.config.role_arn, &session_name, token.trim())
            .await
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}

pub(crate) fn default_session_name() -> String {
    format!("stratus-{}", Utc::now().timestamp_millis())
}

/// Minimal STS client for `AssumeRoleWithWebIdentity`
#[derive(Debug, Clone)]
pub(crate) struct StsClient {
    http: HttpClient,
    endpoint: Url,
    provider: &'static str,
}

impl StsClient {
    /// Endpoint precedence: `AWS_ENDPOINT_URL_STS`, regional, global
    pub(crate) fn new(
        http: HttpClient,
        platform: &dyn Platform,
        region: Option<&str>,
        provider: &'static str,
    ) -> Result<Self, ResolveError> {
        let raw = match (non_empty_env(platform, STS_ENDPOINT), region) {
            (Some(endpoint), _) => endpoint,
            (None, Some(region)) => format!("https://sts.{region}.amazonaws.com/"),
            (None, None) => STS_GLOBAL_ENDPOINT.to_string(),
        };
        let endpoint = Url::parse(&raw).map_err(|e| {
            ResolveError::source_failure(provider, format!("invalid STS endpoint {raw:?}"))
                .with_source(e)
        })?;

        Ok(Self {
            http,
            endpoint,
            provider,
        })
    }

    pub(crate) async fn assume_role_with_web_identity(
        &self,
        role_arn: &str,
        session_name: &str,
        token: &str,
    ) -> Result<Credentials, ResolveError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", "AssumeRoleWithWebIdentity")
            .append_pair("Version", STS_API_VERSION)
            .append_pair("RoleArn", role_arn)
            .append_pair("RoleSessionName", session_name)
            .append_pair("WebIdentityToken", token)
            .finish();

        let request = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.as_str())
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::ACCEPT, "application/json")
            .body(Bytes::from(body))
            .map_err(|e| {
                ResolveError::source_failure(self.provider, "failed to build STS request")
                    .with_source(e)
            })?;

        debug!(
            provider = self.provider,
            role_arn,
            endpoint = %self.endpoint,
            "Calling AssumeRoleWithWebIdentity"
        );

        let response = self
            .http
            .execute("sts", "AssumeRoleWithWebIdentity", request)
            .await
            .map_err(|e| {
                ResolveError::source_failure(self.provider, "STS request failed").with_source(e)
            })?;

        if !response.status().is_success() {
            return Err(ResolveError::source_failure(
                self.provider,
                format!(
                    "STS returned {}: {}",
                    response.status(),
                    body_excerpt(&response)
                ),
            ));
        }

        let envelope: AssumeRoleEnvelope =
            serde_json::from_slice(response.body()).map_err(|e| {
                ResolveError::source_failure(self.provider, "malformed STS response")
                    .with_source(e)
            })?;

        envelope
            .response
            .result
            .credentials
            .into_credentials(self.provider)
    }
}

#[derive(Debug, Deserialize)]
struct AssumeRoleEnvelope {
    #[serde(rename = "AssumeRoleWithWebIdentityResponse")]
    response: AssumeRoleResponse,
}

#[derive(Debug, Deserialize)]
struct AssumeRoleResponse {
    #[serde(rename = "AssumeRoleWithWebIdentityResult")]
    result: AssumeRoleResult,
}

#[derive(Debug, Deserialize)]
struct AssumeRoleResult {
    #[serde(rename = "Credentials")]
    credentials: CredentialsDocument,
}
