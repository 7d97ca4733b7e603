//! The credential resolution capability

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{Credentials, ResolveContext, ResolveError};

/// Something that can produce [`Credentials`] on demand
///
/// Implementations must be safe to call concurrently from many tasks.
#[async_trait]
pub trait ProvideCredentials: Send + Sync + fmt::Debug {
    /// Produce credentials, or explain why none are available
    async fn resolve(&self, ctx: &ResolveContext) -> Result<Credentials, ResolveError>;

    /// Human-readable provider name used in logs and errors
    fn name(&self) -> &str;
}

/// Shared, type-erased provider
pub type SharedProvider = Arc<dyn ProvideCredentials>;

/// Static credentials resolve to themselves
#[async_trait]
impl ProvideCredentials for Credentials {
    async fn resolve(&self, _ctx: &ResolveContext) -> Result<Credentials, ResolveError> {
        Ok(self.clone())
    }

    fn name(&self) -> &str {
        self.provider_name().unwrap_or("Static")
    }
}

#[async_trait]
impl<T> ProvideCredentials for Arc<T>
where
    T: ProvideCredentials + ?Sized,
{
    async fn resolve(&self, ctx: &ResolveContext) -> Result<Credentials, ResolveError> {
        (**self).resolve(ctx).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
