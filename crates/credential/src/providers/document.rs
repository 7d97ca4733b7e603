//! JSON credential documents returned by metadata endpoints and STS

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::core::{Credentials, ResolveError};

/// Credential payload shared by the container endpoint, IMDS and STS
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CredentialsDocument {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    access_key_id: Option<String>,
    #[serde(default)]
    secret_access_key: Option<String>,
    #[serde(default, alias = "SessionToken")]
    token: Option<String>,
    #[serde(default)]
    expiration: Option<Expiration>,
}

/// STS reports epoch seconds, metadata endpoints report RFC 3339
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Expiration {
    EpochSeconds(f64),
    Timestamp(String),
}

impl Expiration {
    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Self::EpochSeconds(secs) => from_epoch_seconds(*secs),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn from_epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.trunc();
    let nanos = ((secs - whole).abs() * 1e9) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

impl CredentialsDocument {
    pub(crate) fn into_credentials(
        self,
        provider: impl Into<Cow<'static, str>>,
    ) -> Result<Credentials, ResolveError> {
        let provider = provider.into();

        if let Some(code) = self.code.as_deref().filter(|code| *code != "Success") {
            let message = self.message.as_deref().unwrap_or("no message");
            return Err(ResolveError::source_failure(
                provider,
                format!("credentials endpoint returned error {code}: {message}"),
            ));
        }

        let Some(access_key_id) = self.access_key_id.filter(|v| !v.is_empty()) else {
            return Err(ResolveError::source_failure(
                provider,
                "response is missing AccessKeyId",
            ));
        };
        let Some(secret) = self.secret_access_key.filter(|v| !v.is_empty()) else {
            return Err(ResolveError::source_failure(
                provider,
                "response is missing SecretAccessKey",
            ));
        };

        let mut credentials = Credentials::new(access_key_id, secret);
        if let Some(token) = self.token.filter(|v| !v.is_empty()) {
            credentials = credentials.with_session_token(token);
        }
        if let Some(expiration) = self.expiration {
            let Some(at) = expiration.to_datetime() else {
                return Err(ResolveError::source_failure(
                    provider,
                    format!("response has an unreadable Expiration: {expiration:?}"),
                ));
            };
            credentials = credentials.with_expiration(at);
        }

        Ok(credentials.with_provider_name(provider))
    }
}
