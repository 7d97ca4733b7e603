//! `reqwest`-backed engine

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EngineFactory, HttpEngine, HttpRequest, HttpResponse};
use crate::HttpError;

/// Timeouts applied by [`ReqwestEngine`]
///
/// # Example
///
/// ```
/// use stratus_http::EngineConfig;
/// use std::time::Duration;
///
/// let config = EngineConfig {
///     connect_timeout: Duration::from_millis(500),
///     ..EngineConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// TCP/TLS connect timeout. Default: 1s
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Whole-request timeout. Default: 5s
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    /// Validate timeout values
    pub fn validate(&self) -> Result<(), String> {
        if self.connect_timeout.is_zero() {
            return Err("connect_timeout must be greater than zero".to_string());
        }
        if self.timeout < self.connect_timeout {
            return Err(format!(
                "timeout ({:?}) must be >= connect_timeout ({:?})",
                self.timeout, self.connect_timeout
            ));
        }
        Ok(())
    }
}

/// Engine backed by a pooled `reqwest::Client`
#[derive(Debug)]
pub struct ReqwestEngine {
    client: reqwest::Client,
    closed: AtomicBool,
}

impl ReqwestEngine {
    /// Build an engine with the given timeouts
    pub fn new(config: &EngineConfig) -> Result<Self, HttpError> {
        config.validate().map_err(HttpError::InvalidRequest)?;

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            closed: AtomicBool::new(false),
        })
    }

    /// Whether [`HttpEngine::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl HttpEngine for ReqwestEngine {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        if self.is_closed() {
            return Err(HttpError::EngineClosed);
        }

        let request = reqwest::Request::try_from(request)
            .map_err(|e| HttpError::InvalidRequest(e.to_string()))?;
        let response = self.client.execute(request).await?;

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        let mut out = http::Response::new(body);
        *out.status_mut() = status;
        *out.version_mut() = version;
        *out.headers_mut() = headers;
        Ok(out)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("reqwest engine closed");
        }
    }
}

/// Factory producing [`ReqwestEngine`]s
#[derive(Debug, Clone, Default)]
pub struct ReqwestEngineFactory {
    config: EngineConfig,
}

impl ReqwestEngineFactory {
    /// Factory with explicit timeouts
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl EngineFactory for ReqwestEngineFactory {
    fn create(&self) -> Result<Arc<dyn HttpEngine>, HttpError> {
        Ok(Arc::new(ReqwestEngine::new(&self.config)?))
    }
}
