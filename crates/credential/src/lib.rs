//! Stratus Credential
//!
//! Resolves cloud API credentials from a prioritized list of sources and
//! caches them:
//!
//! - [`ProvideCredentials`]: the resolution capability every source implements
//! - [`providers`]: environment, shared profile files, web identity token,
//!   container endpoint and instance metadata
//! - [`ProviderChain`]: ordered fallback with per-provider failure reporting
//! - [`DeferredProvider`]: moves construction errors to the first resolve
//! - [`CachedProvider`]: single-flight cache with a refresh margin
//! - [`DefaultChainProvider`]: all of the above, wired with an HTTP engine
//!   it either owns or borrows
//!
//! ```no_run
//! use stratus_credential::{DefaultChainProvider, ProvideCredentials, ResolveContext};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = DefaultChainProvider::new()?;
//! let creds = provider.resolve(&ResolveContext::new()).await?;
//! println!("{} via {:?}", creds.access_key_id(), creds.provider_name());
//! provider.close();
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod cache;
mod chain;
mod core;
mod default_chain;
mod deferred;
mod platform;
mod provider;
pub mod providers;
pub mod testing;

pub use cache::{CacheConfig, CacheStats, CachedProvider, CachedProviderBuilder};
pub use chain::ProviderChain;
pub use crate::core::{
    Clock, ConfigError, Credentials, ErrorKind, ManualClock, ProviderAttempt, ResolveContext,
    ResolveError, SecretString, SystemClock,
};
pub use default_chain::{DefaultChainBuilder, DefaultChainProvider, EngineOwnership, EngineSource};
pub use deferred::DeferredProvider;
pub use platform::{Platform, StaticPlatform, SystemPlatform, env_region};
pub use provider::{ProvideCredentials, SharedProvider};
