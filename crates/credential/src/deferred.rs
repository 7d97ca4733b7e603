//! Lazily constructed providers
//!
//! Some providers validate their environment when built. Wrapping them in
//! [`DeferredProvider`] moves that work, and any error it raises, to the
//! first `resolve` call so assembling a chain never fails.

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tracing::debug;

use crate::core::{Credentials, ResolveContext, ResolveError};
use crate::provider::{ProvideCredentials, SharedProvider};

type Factory = Box<dyn Fn() -> Result<SharedProvider, ResolveError> + Send + Sync>;

/// Provider built on first use
///
/// The factory runs at most once. Its outcome, provider or error, is kept
/// and reused by every later call.
///
/// # Examples
///
/// ```
/// use stratus_credential::{Credentials, DeferredProvider};
///
/// let deferred = DeferredProvider::new("Static", || {
///     Ok(Credentials::new("AKID", "secret"))
/// });
/// assert!(!deferred.is_initialized());
/// ```
pub struct DeferredProvider {
    name: Cow<'static, str>,
    factory: Factory,
    state: OnceLock<Result<SharedProvider, ResolveError>>,
}

impl DeferredProvider {
    pub fn new<F, P>(name: impl Into<Cow<'static, str>>, factory: F) -> Self
    where
        F: Fn() -> Result<P, ResolveError> + Send + Sync + 'static,
        P: ProvideCredentials + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(move || factory().map(|provider| Arc::new(provider) as SharedProvider)),
            state: OnceLock::new(),
        }
    }

    /// Whether the factory has already run
    pub fn is_initialized(&self) -> bool {
        self.state.get().is_some()
    }

    fn inner(&self) -> &Result<SharedProvider, ResolveError> {
        self.state.get_or_init(|| {
            let outcome = (self.factory)();
            match &outcome {
                Ok(_) => debug!(provider = %self.name, "Deferred provider constructed"),
                Err(e) => debug!(provider = %self.name, error = %e, "Deferred provider unavailable"),
            }
            outcome
        })
    }
}

impl fmt::Debug for DeferredProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredProvider")
            .field("name", &self.name)
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProvideCredentials for DeferredProvider {
    async fn resolve(&self, ctx: &ResolveContext) -> Result<Credentials, ResolveError> {
        match self.inner() {
            Ok(provider) => provider.resolve(ctx).await,
            Err(e) => Err(e.clone().for_provider(self.name.clone())),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
