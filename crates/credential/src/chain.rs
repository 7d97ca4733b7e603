//! Ordered fallback over several providers

use std::fmt;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::{Credentials, ProviderAttempt, ResolveContext, ResolveError};
use crate::provider::{ProvideCredentials, SharedProvider};

/// Tries providers in order and returns the first success
///
/// Later providers are not called once one succeeds. When every provider
/// fails, the error lists each provider's failure in chain order.
///
/// # Examples
///
/// ```
/// use stratus_credential::{Credentials, ProviderChain};
///
/// let chain = ProviderChain::new()
///     .with(Credentials::new("AKID1", "s").with_provider_name("First"))
///     .with(Credentials::new("AKID2", "s").with_provider_name("Second"));
/// assert_eq!(chain.names(), vec!["First", "Second"]);
/// ```
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<SharedProvider>,
}

impl ProviderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from already shared providers
    pub fn from_providers(providers: Vec<SharedProvider>) -> Self {
        Self { providers }
    }

    /// Append a provider (builder pattern)
    #[must_use]
    pub fn with(self, provider: impl ProvideCredentials + 'static) -> Self {
        self.with_shared(std::sync::Arc::new(provider))
    }

    /// Append an already shared provider
    #[must_use]
    pub fn with_shared(mut self, provider: SharedProvider) -> Self {
        self.providers.push(provider);
        self
    }

    /// Provider names in resolution order
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderChain")
            .field("providers", &self.names())
            .finish()
    }
}

#[async_trait]
impl ProvideCredentials for ProviderChain {
    async fn resolve(&self, ctx: &ResolveContext) -> Result<Credentials, ResolveError> {
        let mut attempts = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            match provider.resolve(ctx).await {
                Ok(credentials) => {
                    debug!(
                        trace_id = %ctx.trace_id,
                        provider = provider.name(),
                        skipped = attempts.len(),
                        "Resolved credentials"
                    );
                    return Ok(credentials);
                }
                Err(error) => {
                    if error.is_not_applicable() {
                        debug!(provider = provider.name(), %error, "Provider not applicable");
                    } else {
                        warn!(provider = provider.name(), %error, "Provider failed");
                    }
                    attempts.push(ProviderAttempt {
                        provider: provider.name().to_string(),
                        error,
                    });
                }
            }
        }

        warn!(
            trace_id = %ctx.trace_id,
            attempts = attempts.len(),
            "No provider in the chain produced credentials"
        );
        Err(ResolveError::ChainExhausted { attempts })
    }

    fn name(&self) -> &str {
        "Chain"
    }
}
