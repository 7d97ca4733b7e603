//! Credentials from the container credentials endpoint
//!
//! Covers both the relative URI form served from the well-known container
//! host and the full URI form, which must be HTTPS or a loopback address.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use stratus_http::HttpClient;
use stratus_http::http::{Method, Request, header};
use tracing::debug;
use url::{Host, Url};

use super::document::CredentialsDocument;
use super::{body_excerpt, header_value};
use crate::core::{Credentials, ResolveContext, ResolveError, SecretString};
use crate::platform::{Platform, non_empty_env};
use crate::provider::ProvideCredentials;

pub const PROVIDER_NAME: &str = "EcsContainer";

pub const RELATIVE_URI: &str = "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI";
pub const FULL_URI: &str = "AWS_CONTAINER_CREDENTIALS_FULL_URI";
pub const AUTHORIZATION_TOKEN: &str = "AWS_CONTAINER_AUTHORIZATION_TOKEN";

const CONTAINER_HOST: &str = "http://169.254.170.2";
const CONTAINER_IP: Ipv4Addr = Ipv4Addr::new(169, 254, 170, 2);

/// Link-local hosts of the container and pod identity agents
const ALLOWED_LINK_LOCAL: [Ipv4Addr; 2] = [CONTAINER_IP, Ipv4Addr::new(169, 254, 170, 23)];

/// Fetches role credentials from the container metadata endpoint
#[derive(Debug, Clone)]
pub struct EcsProvider {
    uri: Url,
    authorization: Option<SecretString>,
    http: HttpClient,
}

impl EcsProvider {
    /// Build from an explicit endpoint
    pub fn new(uri: Url, authorization: Option<SecretString>, http: HttpClient) -> Self {
        Self {
            uri,
            authorization,
            http,
        }
    }

    /// Build from the container environment variables
    ///
    /// The relative URI wins when both forms are set.
    pub fn from_env(platform: Arc<dyn Platform>, http: HttpClient) -> Result<Self, ResolveError> {
        let platform = platform.as_ref();
        let uri = if let Some(relative) = non_empty_env(platform, RELATIVE_URI) {
            relative_uri(&relative)?
        } else if let Some(full) = non_empty_env(platform, FULL_URI) {
            full_uri(&full)?
        } else {
            return Err(ResolveError::not_applicable(
                PROVIDER_NAME,
                format!("neither {RELATIVE_URI} nor {FULL_URI} is set"),
            ));
        };

        let authorization = non_empty_env(platform, AUTHORIZATION_TOKEN).map(SecretString::new);
        Ok(Self::new(uri, authorization, http))
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }
}

fn invalid_uri(raw: &str, error: url::ParseError) -> ResolveError {
    ResolveError::source_failure(PROVIDER_NAME, format!("invalid container credentials URI {raw:?}"))
        .with_source(error)
}

/// The relative form is a path on the container host and never names a host
fn relative_uri(relative: &str) -> Result<Url, ResolveError> {
    if !relative.starts_with('/') || relative.starts_with("//") {
        return Err(ResolveError::source_failure(
            PROVIDER_NAME,
            format!("{RELATIVE_URI} must be a path starting with a single '/', got {relative:?}"),
        ));
    }

    let raw = format!("{CONTAINER_HOST}{relative}");
    let uri = Url::parse(&raw).map_err(|e| invalid_uri(&raw, e))?;
    if uri.host() != Some(Host::Ipv4(CONTAINER_IP)) {
        return Err(ResolveError::source_failure(
            PROVIDER_NAME,
            format!("{RELATIVE_URI} moved the request off the container host: {relative:?}"),
        ));
    }
    Ok(uri)
}

fn full_uri(full: &str) -> Result<Url, ResolveError> {
    let uri = Url::parse(full).map_err(|e| invalid_uri(full, e))?;
    if uri.scheme() == "https" || is_allowed_http_host(&uri) {
        Ok(uri)
    } else {
        Err(ResolveError::source_failure(
            PROVIDER_NAME,
            format!(
                "{FULL_URI} must use HTTPS or a loopback or container host, got {}",
                uri.host_str().unwrap_or_default()
            ),
        ))
    }
}

fn is_allowed_http_host(uri: &Url) -> bool {
    if uri.scheme() != "http" {
        return false;
    }
    match uri.host() {
        Some(Host::Ipv4(ip)) => ip.is_loopback() || ALLOWED_LINK_LOCAL.contains(&ip),
        Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        None => false,
    }
}

#[async_trait]
impl ProvideCredentials for EcsProvider {
    async fn resolve(&self, _ctx: &ResolveContext) -> Result<Credentials, ResolveError> {
        let mut builder = Request::builder()
            .method(Method::GET)
            .uri(self.uri.as_str())
            .header(header::ACCEPT, "application/json");
        if let Some(token) = &self.authorization {
            let value = token.expose_secret(header_value).ok_or_else(|| {
                ResolveError::source_failure(
                    PROVIDER_NAME,
                    format!("{AUTHORIZATION_TOKEN} is not a valid header value"),
                )
            })?;
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let request = builder.body(Bytes::new()).map_err(|e| {
            ResolveError::source_failure(PROVIDER_NAME, "failed to build request").with_source(e)
        })?;

        debug!(provider = PROVIDER_NAME, uri = %self.uri, "Fetching container credentials");
        let response = self
            .http
            .execute("ecs-credentials", "GetCredentials", request)
            .await
            .map_err(|e| {
                ResolveError::source_failure(PROVIDER_NAME, "container credentials request failed")
                    .with_source(e)
            })?;

        if !response.status().is_success() {
            return Err(ResolveError::source_failure(
                PROVIDER_NAME,
                format!(
                    "container credentials endpoint returned {}: {}",
                    response.status(),
                    body_excerpt(&response)
                ),
            ));
        }

        let document: CredentialsDocument =
            serde_json::from_slice(response.body()).map_err(|e| {
                ResolveError::source_failure(PROVIDER_NAME, "malformed container credentials")
                    .with_source(e)
            })?;
        document.into_credentials(PROVIDER_NAME)
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}
