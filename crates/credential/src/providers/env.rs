//! Credentials from process environment variables

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::core::{Credentials, ResolveContext, ResolveError};
use crate::platform::{Platform, non_empty_env};
use crate::provider::ProvideCredentials;

pub const PROVIDER_NAME: &str = "Environment";

pub const ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

/// Reads `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN`
///
/// Variables are read on every call, never at construction.
#[derive(Debug, Clone)]
pub struct EnvironmentProvider {
    platform: Arc<dyn Platform>,
}

impl EnvironmentProvider {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl ProvideCredentials for EnvironmentProvider {
    async fn resolve(&self, _ctx: &ResolveContext) -> Result<Credentials, ResolveError> {
        let platform = self.platform.as_ref();

        let Some(access_key_id) = non_empty_env(platform, ACCESS_KEY_ID) else {
            return Err(ResolveError::not_applicable(
                PROVIDER_NAME,
                format!("{ACCESS_KEY_ID} is not set"),
            ));
        };
        let Some(secret) = non_empty_env(platform, SECRET_ACCESS_KEY) else {
            return Err(ResolveError::source_failure(
                PROVIDER_NAME,
                format!("{ACCESS_KEY_ID} is set but {SECRET_ACCESS_KEY} is not"),
            ));
        };

        let mut credentials = Credentials::new(access_key_id, secret);
        if let Some(token) = non_empty_env(platform, SESSION_TOKEN) {
            credentials = credentials.with_session_token(token);
        }

        debug!(provider = PROVIDER_NAME, "Loaded credentials from environment");
        Ok(credentials.with_provider_name(PROVIDER_NAME))
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}
