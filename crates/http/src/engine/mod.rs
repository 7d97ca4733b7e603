//! Transport capability
//!
//! An [`HttpEngine`] sends one fully formed request and returns the buffered
//! response. Engines are shared (`Arc<dyn HttpEngine>`) between every client
//! that uses them; whoever creates an engine decides who closes it.

mod reqwest_engine;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::HttpError;

pub use reqwest_engine::{EngineConfig, ReqwestEngine, ReqwestEngineFactory};

/// Request type carried through the pipeline
pub type HttpRequest = http::Request<Bytes>;

/// Buffered response type
pub type HttpResponse = http::Response<Bytes>;

/// Sends HTTP requests
#[async_trait]
pub trait HttpEngine: Send + Sync + fmt::Debug {
    /// Send a single request (one physical attempt)
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;

    /// Release pooled connections and reject further requests
    ///
    /// Must be idempotent. The default does nothing.
    fn close(&self) {}
}

/// Creates engines on demand
///
/// Used where a component may either borrow a caller's engine or build its
/// own; the component owns whatever the factory returns.
pub trait EngineFactory: Send + Sync + fmt::Debug {
    /// Build a fresh engine
    fn create(&self) -> Result<Arc<dyn HttpEngine>, HttpError>;
}

/// Copy a request so each attempt gets its own mutable headers
pub(crate) fn clone_request(request: &HttpRequest) -> HttpRequest {
    let mut cloned = http::Request::new(request.body().clone());
    *cloned.method_mut() = request.method().clone();
    *cloned.uri_mut() = request.uri().clone();
    *cloned.version_mut() = request.version();
    *cloned.headers_mut() = request.headers().clone();
    cloned
}
