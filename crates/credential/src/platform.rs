//! Process environment and filesystem access
//!
//! Providers read environment variables and files only through [`Platform`]
//! so tests can run against a fixed, in-memory environment.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Environment variable and file access
#[async_trait]
pub trait Platform: Send + Sync + fmt::Debug {
    /// Value of an environment variable, if set
    fn env_var(&self, key: &str) -> Option<String>;

    /// Read a whole file as UTF-8
    async fn read_file(&self, path: &Path) -> io::Result<String>;

    /// Current user's home directory
    fn home_dir(&self) -> Option<PathBuf> {
        self.env_var("HOME")
            .or_else(|| self.env_var("USERPROFILE"))
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
    }
}

/// The real process environment and filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPlatform;

#[async_trait]
impl Platform for SystemPlatform {
    fn env_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    async fn read_file(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }
}

/// Fixed in-memory environment
///
/// # Examples
///
/// ```
/// use stratus_credential::{Platform, StaticPlatform};
///
/// let platform = StaticPlatform::new().with_env("AWS_REGION", "eu-west-1");
/// assert_eq!(platform.env_var("AWS_REGION").as_deref(), Some("eu-west-1"));
/// assert_eq!(platform.env_var("AWS_PROFILE"), None);
/// ```
#[derive(Debug, Default, Clone)]
pub struct StaticPlatform {
    env: HashMap<String, String>,
    files: HashMap<PathBuf, String>,
}

impl StaticPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }
}

#[async_trait]
impl Platform for StaticPlatform {
    fn env_var(&self, key: &str) -> Option<String> {
        self.env.get(key).cloned()
    }

    async fn read_file(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )
        })
    }
}

/// Environment variable with blank values treated as unset
pub(crate) fn non_empty_env(platform: &dyn Platform, key: &str) -> Option<String> {
    platform
        .env_var(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Region from `AWS_REGION`, falling back to `AWS_DEFAULT_REGION`
pub fn env_region(platform: &dyn Platform) -> Option<String> {
    non_empty_env(platform, "AWS_REGION").or_else(|| non_empty_env(platform, "AWS_DEFAULT_REGION"))
}
