//! Cache configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::ConfigError;

/// Freshness policy for [`CachedProvider`](super::CachedProvider)
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use stratus_credential::CacheConfig;
///
/// let config = CacheConfig {
///     refresh_margin: Duration::from_secs(60),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Refresh this long before the credentials' expiry
    #[serde(with = "humantime_serde")]
    pub refresh_margin: Duration,

    /// Lifetime assumed for credentials without an expiry; `None` caches them forever
    #[serde(with = "humantime_serde")]
    pub default_ttl: Option<Duration>,
}

impl CacheConfig {
    pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(10);

    /// Longest accepted refresh margin
    pub const MAX_REFRESH_MARGIN: Duration = Duration::from_secs(60 * 60);

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_margin > Self::MAX_REFRESH_MARGIN {
            return Err(ConfigError::InvalidValue {
                field: "cache.refresh_margin",
                reason: format!(
                    "must be at most {}s, got {}s",
                    Self::MAX_REFRESH_MARGIN.as_secs(),
                    self.refresh_margin.as_secs()
                ),
            });
        }
        if self.default_ttl.is_some_and(|ttl| ttl <= self.refresh_margin) {
            return Err(ConfigError::InvalidValue {
                field: "cache.default_ttl",
                reason: "must be longer than refresh_margin".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_margin: Self::DEFAULT_REFRESH_MARGIN,
            default_ttl: None,
        }
    }
}
