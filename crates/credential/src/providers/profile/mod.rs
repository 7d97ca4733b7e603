//! Credentials from the shared config and credentials files
//!
//! Static keys are returned directly. A profile that names a role and a web
//! identity token file is resolved through STS. Other profile-based
//! mechanisms are reported as unsupported.

mod parser;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use stratus_http::HttpClient;
use tracing::debug;

use self::parser::{FileKind, Section};
use super::web_identity::{StsClient, default_session_name};
use crate::core::{Credentials, ResolveContext, ResolveError};
use crate::platform::{Platform, env_region, non_empty_env};
use crate::provider::ProvideCredentials;

pub const PROVIDER_NAME: &str = "Profile";

pub const PROFILE: &str = "AWS_PROFILE";
pub const CONFIG_FILE: &str = "AWS_CONFIG_FILE";
pub const CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";

pub const DEFAULT_PROFILE: &str = "default";

const UNSUPPORTED_KEYS: [&str; 4] = [
    "credential_process",
    "sso_session",
    "sso_start_url",
    "source_profile",
];

/// Reads the selected profile from the shared files
#[derive(Debug, Clone)]
pub struct ProfileProvider {
    platform: Arc<dyn Platform>,
    http: HttpClient,
    profile_name: Option<String>,
    region: Option<String>,
}

impl ProfileProvider {
    /// `profile_name` overrides `AWS_PROFILE`; `region` overrides the environment
    pub fn new(
        platform: Arc<dyn Platform>,
        http: HttpClient,
        profile_name: Option<String>,
        region: Option<String>,
    ) -> Self {
        Self {
            platform,
            http,
            profile_name,
            region,
        }
    }

    fn selected_profile(&self) -> String {
        self.profile_name
            .clone()
            .or_else(|| non_empty_env(self.platform.as_ref(), PROFILE))
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
    }

    fn file_path(&self, variable: &str, default_name: &str) -> Option<PathBuf> {
        non_empty_env(self.platform.as_ref(), variable)
            .map(PathBuf::from)
            .or_else(|| {
                self.platform
                    .home_dir()
                    .map(|home| home.join(".aws").join(default_name))
            })
    }

    /// Merge the profile's keys from both files; credentials file wins
    async fn load_profile(&self, profile: &str) -> Result<Section, ResolveError> {
        let files = [
            (self.file_path(CONFIG_FILE, "config"), FileKind::Config),
            (
                self.file_path(CREDENTIALS_FILE, "credentials"),
                FileKind::Credentials,
            ),
        ];

        let mut any_file = false;
        let mut found = false;
        let mut merged = Section::new();

        for (path, kind) in files {
            let Some(path) = path else { continue };
            match self.platform.read_file(&path).await {
                Ok(contents) => {
                    any_file = true;
                    if let Some(section) = parser::parse(&contents, kind).remove(profile) {
                        found = true;
                        merged.extend(section);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "Shared profile file not found");
                }
                Err(e) => {
                    return Err(ResolveError::source_failure(
                        PROVIDER_NAME,
                        format!("failed to read {}", path.display()),
                    )
                    .with_source(e));
                }
            }
        }

        if !any_file {
            return Err(ResolveError::not_applicable(
                PROVIDER_NAME,
                "no shared config or credentials file found",
            ));
        }
        if !found {
            return Err(ResolveError::not_applicable(
                PROVIDER_NAME,
                format!("profile '{profile}' is not defined"),
            ));
        }
        Ok(merged)
    }

    async fn assume_role(
        &self,
        profile: &str,
        section: &Section,
        role_arn: &str,
        token_file: &str,
    ) -> Result<Credentials, ResolveError> {
        let token = self
            .platform
            .read_file(std::path::Path::new(token_file))
            .await
            .map_err(|e| {
                ResolveError::source_failure(
                    PROVIDER_NAME,
                    format!("failed to read web identity token from {token_file}"),
                )
                .with_source(e)
            })?;

        let region = section
            .get("region")
            .cloned()
            .or_else(|| self.region.clone())
            .or_else(|| env_region(self.platform.as_ref()));
        let sts = StsClient::new(
            self.http.clone(),
            self.platform.as_ref(),
            region.as_deref(),
            PROVIDER_NAME,
        )?;
        let session_name = section
            .get("role_session_name")
            .cloned()
            .unwrap_or_else(default_session_name);

        debug!(profile, role_arn, "Assuming role from profile web identity token");
        sts.assume_role_with_web_identity(role_arn, &session_name, token.trim())
            .await
    }
}

fn non_empty<'a>(section: &'a Section, key: &str) -> Option<&'a str> {
    section
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

#[async_trait]
impl ProvideCredentials for ProfileProvider {
    async fn resolve(&self, _ctx: &ResolveContext) -> Result<Credentials, ResolveError> {
        let profile = self.selected_profile();
        let section = self.load_profile(&profile).await?;

        if let Some(role_arn) = non_empty(&section, "role_arn") {
            return match non_empty(&section, "web_identity_token_file") {
                Some(token_file) => {
                    self.assume_role(&profile, &section, role_arn, token_file)
                        .await
                }
                None => Err(ResolveError::source_failure(
                    PROVIDER_NAME,
                    format!(
                        "profile '{profile}' assumes a role without web_identity_token_file, which is not supported"
                    ),
                )),
            };
        }

        match (
            non_empty(&section, "aws_access_key_id"),
            non_empty(&section, "aws_secret_access_key"),
        ) {
            (Some(access_key_id), Some(secret)) => {
                let mut credentials = Credentials::new(access_key_id, secret);
                if let Some(token) = non_empty(&section, "aws_session_token") {
                    credentials = credentials.with_session_token(token);
                }
                debug!(profile = %profile, "Loaded static credentials from profile");
                Ok(credentials.with_provider_name(PROVIDER_NAME))
            }
            (Some(_), None) => Err(ResolveError::source_failure(
                PROVIDER_NAME,
                format!("profile '{profile}' has aws_access_key_id but no aws_secret_access_key"),
            )),
            _ => {
                if let Some(key) = UNSUPPORTED_KEYS.iter().find(|key| section.contains_key(**key)) {
                    return Err(ResolveError::source_failure(
                        PROVIDER_NAME,
                        format!("profile '{profile}' uses {key}, which is not supported"),
                    ));
                }
                Err(ResolveError::not_applicable(
                    PROVIDER_NAME,
                    format!("profile '{profile}' has no credentials"),
                ))
            }
        }
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}
