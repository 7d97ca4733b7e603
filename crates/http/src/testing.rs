//! Test doubles
//!
//! [`TestEngine`] replays scripted outcomes and records every request it
//! receives. Once the script is exhausted it answers `200 OK` with an empty
//! body.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::engine::clone_request;
use crate::{HttpEngine, HttpError, HttpRequest, HttpResponse};

/// Scripted in-memory engine
#[derive(Debug, Default)]
pub struct TestEngine {
    script: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<HttpRequest>>,
    closes: AtomicUsize,
}

impl TestEngine {
    /// Empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with the given status and body
    pub fn push_status(&self, status: u16, body: impl Into<Bytes>) {
        let mut response = http::Response::new(body.into());
        *response.status_mut() =
            http::StatusCode::from_u16(status).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
        self.script.lock().push_back(Ok(response));
    }

    /// Queue a transport-level failure
    pub fn push_error(&self, error: HttpError) {
        self.script.lock().push_back(Err(error));
    }

    /// Copies of every request received, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().iter().map(clone_request).collect()
    }

    /// Number of requests received
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of times [`HttpEngine::close`] was called
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpEngine for TestEngine {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.requests.lock().push(request);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(http::Response::new(Bytes::new())))
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
