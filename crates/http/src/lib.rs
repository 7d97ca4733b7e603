//! Stratus HTTP
//!
//! The request plumbing shared by every network-backed credential source and by
//! API clients built on top of them:
//!
//! - [`HttpEngine`]: the transport capability (`reqwest` by default)
//! - [`OperationContext`]: per logical request state (invocation id, retry state)
//! - [`StandardRetryStrategy`]: exponential backoff driver with jitter
//! - [`Interceptor`]: per-attempt request hooks, including
//!   [`RetryHeaderInterceptor`] which stamps `amz-sdk-invocation-id` and
//!   `amz-sdk-request` on every physical attempt
//! - [`HttpClient`]: ties the above together
//!
//! ```no_run
//! use bytes::Bytes;
//! use stratus_http::{EngineConfig, HttpClient, OperationContext, ReqwestEngine};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), stratus_http::HttpError> {
//! let engine = Arc::new(ReqwestEngine::new(&EngineConfig::default())?);
//! let client = HttpClient::new(engine);
//!
//! let mut ctx = OperationContext::new("sts", "GetCallerIdentity");
//! let request = http::Request::get("https://sts.amazonaws.com/")
//!     .body(Bytes::new())
//!     .map_err(|e| stratus_http::HttpError::InvalidRequest(e.to_string()))?;
//! let response = client.send(&mut ctx, request).await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod client;
mod context;
pub mod engine;
mod error;
pub mod interceptor;
pub mod retry;
pub mod testing;

pub use client::{HttpClient, HttpClientBuilder};
pub use context::{OperationContext, RetryState};
pub use engine::{
    EngineConfig, EngineFactory, HttpEngine, HttpRequest, HttpResponse, ReqwestEngine,
    ReqwestEngineFactory,
};
pub use error::HttpError;
pub use interceptor::{INVOCATION_ID_HEADER, Interceptor, REQUEST_HEADER, RetryHeaderInterceptor};
pub use retry::{RetryConfig, RetryDecision, StandardRetryStrategy};

// Re-export so downstream crates build requests against the same versions
pub use bytes::Bytes;
pub use http;
