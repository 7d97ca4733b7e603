//! Subcommand implementations

pub mod chain;
pub mod resolve;

use std::sync::Arc;

use anyhow::{Context, Result};
use stratus_credential::DefaultChainProvider;
use stratus_http::ReqwestEngineFactory;

use crate::config::CliConfig;

/// Build the default chain from loaded configuration
fn build_provider(config: &CliConfig) -> Result<DefaultChainProvider> {
    let mut builder = DefaultChainProvider::builder()
        .cache_config(config.cache.clone())
        .retry_config(config.retry.clone())
        .engine_factory(Arc::new(ReqwestEngineFactory::new(config.engine.clone())));
    if let Some(profile) = &config.profile {
        builder = builder.profile_name(profile);
    }
    if let Some(region) = &config.region {
        builder = builder.region(region);
    }
    builder.build().context("Failed to build credential provider chain")
}
