//! Layered configuration
//!
//! Precedence (lowest to highest): built-in defaults, the TOML file given by
//! `--config`, `STRATUS_*` environment variables (`__` separates nesting, as
//! in `STRATUS_CACHE__REFRESH_MARGIN=30s`), command-line flags.

use std::path::Path;

use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use stratus_credential::CacheConfig;
use stratus_http::{EngineConfig, RetryConfig};

/// Everything the CLI needs to build the default chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub profile: Option<String>,
    pub region: Option<String>,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub engine: EngineConfig,
}

impl CliConfig {
    /// Load defaults, then `file`, then the environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::figment(file)?
            .extract()
            .context("Failed to load configuration")
    }

    fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            if !path.is_file() {
                bail!("Config file {} does not exist", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }
        // Unknown keys such as `log` (from STRATUS_LOG) are ignored on extraction
        Ok(figment.merge(Env::prefixed("STRATUS_").split("__")))
    }

    /// Apply command-line overrides
    #[must_use]
    pub fn with_overrides(mut self, profile: Option<String>, region: Option<String>) -> Self {
        if profile.is_some() {
            self.profile = profile;
        }
        if region.is_some() {
            self.region = region;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.retry
            .validate()
            .map_err(|reason| anyhow::anyhow!("Invalid retry configuration: {reason}"))?;
        self.engine
            .validate()
            .map_err(|reason| anyhow::anyhow!("Invalid engine configuration: {reason}"))?;
        Ok(())
    }
}
