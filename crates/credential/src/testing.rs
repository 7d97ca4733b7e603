//! Test doubles
//!
//! [`MockProvider`] counts calls, can delay its answer and replays scripted
//! outcomes before falling back to a default one.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{Credentials, ResolveContext, ResolveError};
use crate::provider::ProvideCredentials;

/// What a [`MockProvider`] does on a call
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Succeed(Credentials),
    Fail(ResolveError),
    /// Panic inside `resolve`
    Panic,
}

/// Scripted provider
#[derive(Debug)]
pub struct MockProvider {
    name: String,
    script: Mutex<VecDeque<MockOutcome>>,
    fallback: MockOutcome,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Provider that answers `NotApplicable` until told otherwise
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let fallback = MockOutcome::Fail(ResolveError::not_applicable(
            name.clone(),
            "mock is not configured",
        ));
        Self {
            name,
            script: Mutex::new(VecDeque::new()),
            fallback,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always succeed with `credentials`
    #[must_use]
    pub fn returning(mut self, credentials: Credentials) -> Self {
        self.fallback = MockOutcome::Succeed(credentials);
        self
    }

    /// Always fail with a `SourceFailure`
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fallback = MockOutcome::Fail(ResolveError::source_failure(
            self.name.clone(),
            message.into(),
        ));
        self
    }

    /// Queue a one-shot outcome ahead of the fallback
    #[must_use]
    pub fn then(self, outcome: MockOutcome) -> Self {
        self.script.lock().push_back(outcome);
        self
    }

    /// Sleep before answering
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `resolve` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProvideCredentials for MockProvider {
    async fn resolve(&self, _ctx: &ResolveContext) -> Result<Credentials, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match outcome {
            MockOutcome::Succeed(credentials) => Ok(credentials),
            MockOutcome::Fail(error) => Err(error),
            MockOutcome::Panic => panic!("mock provider {} panicked", self.name),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
