//! The standard provider chain with caching and HTTP engine ownership
//!
//! Resolution order: environment variables, shared profile files, web
//! identity token, container credentials endpoint, instance metadata.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use stratus_http::{EngineFactory, HttpClient, HttpEngine, ReqwestEngineFactory, RetryConfig};
use tracing::{debug, info};

use crate::cache::{CacheConfig, CacheStats, CachedProvider};
use crate::chain::ProviderChain;
use crate::core::{Clock, ConfigError, Credentials, ResolveContext, ResolveError, SystemClock};
use crate::deferred::DeferredProvider;
use crate::platform::{Platform, SystemPlatform, env_region};
use crate::provider::ProvideCredentials;
use crate::providers::{
    EcsProvider, EnvironmentProvider, ImdsProvider, ProfileProvider, WebIdentityProvider, ecs,
    web_identity,
};

/// Where the chain's HTTP engine comes from
#[derive(Debug, Clone)]
pub enum EngineSource {
    /// Create a new engine; the chain owns it and closes it
    Factory(Arc<dyn EngineFactory>),
    /// Use a caller-supplied engine; the chain never closes it
    Shared(Arc<dyn HttpEngine>),
}

impl Default for EngineSource {
    fn default() -> Self {
        Self::Factory(Arc::new(ReqwestEngineFactory::default()))
    }
}

/// Whether the chain is responsible for closing its engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineOwnership {
    Owned,
    Borrowed,
}

/// Default credential chain behind a single-flight cache
///
/// # Examples
///
/// ```no_run
/// use stratus_credential::{DefaultChainProvider, ProvideCredentials, ResolveContext};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = DefaultChainProvider::builder()
///     .profile_name("dev")
///     .region("eu-west-1")
///     .build()?;
///
/// let creds = provider.resolve(&ResolveContext::new()).await?;
/// println!("resolved {}", creds.access_key_id());
/// provider.close();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DefaultChainProvider {
    cache: CachedProvider,
    chain_names: Vec<String>,
    engine: Arc<dyn HttpEngine>,
    ownership: EngineOwnership,
    closed: AtomicBool,
}

impl DefaultChainProvider {
    pub fn builder() -> DefaultChainBuilder {
        DefaultChainBuilder::default()
    }

    /// Build with every setting at its default
    pub fn new() -> Result<Self, ConfigError> {
        Self::builder().build()
    }

    /// Provider names in resolution order
    pub fn chain_names(&self) -> &[String] {
        &self.chain_names
    }

    pub fn engine_ownership(&self) -> EngineOwnership {
        self.ownership
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Release resources
    ///
    /// Closes the HTTP engine only when the chain created it. Calling this
    /// more than once has no further effect. Later `resolve` calls fail with
    /// [`ResolveError::Closed`].
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.cache.close();
        match self.ownership {
            EngineOwnership::Owned => {
                self.engine.close();
                debug!("Closed owned HTTP engine");
            }
            EngineOwnership::Borrowed => debug!("Left borrowed HTTP engine open"),
        }
        info!("Default credentials chain closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl ProvideCredentials for DefaultChainProvider {
    async fn resolve(&self, ctx: &ResolveContext) -> Result<Credentials, ResolveError> {
        if self.is_closed() {
            return Err(ResolveError::Closed);
        }
        self.cache.resolve(ctx).await
    }

    fn name(&self) -> &str {
        "DefaultChain"
    }
}

/// Builder for [`DefaultChainProvider`]
#[derive(Debug)]
pub struct DefaultChainBuilder {
    profile_name: Option<String>,
    region: Option<String>,
    cache: CacheConfig,
    retry: RetryConfig,
    engine: EngineSource,
    platform: Arc<dyn Platform>,
    clock: Arc<dyn Clock>,
}

impl Default for DefaultChainBuilder {
    fn default() -> Self {
        Self {
            profile_name: None,
            region: None,
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            engine: EngineSource::default(),
            platform: Arc::new(SystemPlatform),
            clock: Arc::new(SystemClock),
        }
    }
}

impl DefaultChainBuilder {
    /// Profile to read instead of `AWS_PROFILE`
    #[must_use]
    pub fn profile_name(mut self, name: impl Into<String>) -> Self {
        self.profile_name = Some(name.into());
        self
    }

    /// Region for STS instead of `AWS_REGION`
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    #[must_use]
    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    #[must_use]
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Use a caller-owned engine; [`DefaultChainProvider::close`] leaves it open
    #[must_use]
    pub fn http_engine(mut self, engine: Arc<dyn HttpEngine>) -> Self {
        self.engine = EngineSource::Shared(engine);
        self
    }

    /// Create the engine from `factory`; the chain owns it
    #[must_use]
    pub fn engine_factory(mut self, factory: Arc<dyn EngineFactory>) -> Self {
        self.engine = EngineSource::Factory(factory);
        self
    }

    #[must_use]
    pub fn platform(mut self, platform: Arc<dyn Platform>) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Assemble the chain
    ///
    /// Never fails because a credential source is missing; those errors
    /// surface at `resolve`.
    pub fn build(self) -> Result<DefaultChainProvider, ConfigError> {
        self.cache.validate()?;
        self.retry
            .validate()
            .map_err(|reason| ConfigError::InvalidValue {
                field: "retry",
                reason,
            })?;

        let (engine, ownership) = match self.engine {
            EngineSource::Factory(factory) => (factory.create()?, EngineOwnership::Owned),
            EngineSource::Shared(engine) => (engine, EngineOwnership::Borrowed),
        };
        let http = HttpClient::builder(Arc::clone(&engine))
            .retry_config(self.retry)
            .build();

        let platform = self.platform;
        let region = self.region.or_else(|| env_region(platform.as_ref()));

        let web_identity = {
            let platform = Arc::clone(&platform);
            let http = http.clone();
            let region = region.clone();
            DeferredProvider::new(web_identity::PROVIDER_NAME, move || {
                WebIdentityProvider::from_env(Arc::clone(&platform), http.clone(), region.clone())
            })
        };
        let container = {
            let platform = Arc::clone(&platform);
            let http = http.clone();
            DeferredProvider::new(ecs::PROVIDER_NAME, move || {
                EcsProvider::from_env(Arc::clone(&platform), http.clone())
            })
        };

        let chain = ProviderChain::new()
            .with(EnvironmentProvider::new(Arc::clone(&platform)))
            .with(ProfileProvider::new(
                Arc::clone(&platform),
                http.clone(),
                self.profile_name,
                region,
            ))
            .with(web_identity)
            .with(container)
            .with(ImdsProvider::new(platform, http));

        let chain_names = chain.names().into_iter().map(str::to_string).collect();
        let cache = CachedProvider::builder(chain)
            .config(self.cache)
            .clock(self.clock)
            .build();

        debug!(?ownership, "Built default credentials chain");
        Ok(DefaultChainProvider {
            cache,
            chain_names,
            engine,
            ownership,
            closed: AtomicBool::new(false),
        })
    }
}

