//! `stratus resolve`

use std::process::ExitCode;

use anyhow::Result;
use serde::Serialize;
use stratus_credential::{Credentials, ProvideCredentials, ResolveContext, ResolveError};
use tracing::debug;

use super::build_provider;
use crate::cli::OutputFormat;
use crate::config::CliConfig;

/// Printable view of resolved credentials; never carries secrets
#[derive(Debug, Serialize)]
struct Summary<'a> {
    provider: &'a str,
    access_key_id: &'a str,
    expiration: Option<String>,
    session_token: bool,
}

impl<'a> Summary<'a> {
    fn new(credentials: &'a Credentials) -> Self {
        Self {
            provider: credentials.provider_name().unwrap_or("unknown"),
            access_key_id: credentials.access_key_id(),
            expiration: credentials.expiration().map(|e| e.to_rfc3339()),
            session_token: credentials.session_token().is_some(),
        }
    }
}

pub async fn execute(config: &CliConfig, format: OutputFormat) -> Result<ExitCode> {
    let provider = build_provider(config)?;
    let ctx = ResolveContext::new();
    debug!(trace_id = %ctx.trace_id, "Resolving credentials");

    let outcome = provider.resolve(&ctx).await;
    provider.close();

    match outcome {
        Ok(credentials) => {
            print!("{}", render(&credentials, format)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            eprint!("{}", render_error(&error));
            Ok(ExitCode::FAILURE)
        }
    }
}

fn render(credentials: &Credentials, format: OutputFormat) -> Result<String> {
    let summary = Summary::new(credentials);
    let out = match format {
        OutputFormat::Text => format!(
            "provider:      {}\naccess_key_id: {}\nexpiration:    {}\nsession_token: {}\n",
            summary.provider,
            summary.access_key_id,
            summary.expiration.as_deref().unwrap_or("never"),
            if summary.session_token { "present" } else { "absent" },
        ),
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Env => {
            let mut lines = vec![
                export("AWS_ACCESS_KEY_ID", credentials.access_key_id()),
                credentials
                    .secret_access_key()
                    .expose_secret(|secret| export("AWS_SECRET_ACCESS_KEY", secret)),
            ];
            if let Some(token) = credentials.session_token() {
                lines.push(token.expose_secret(|token| export("AWS_SESSION_TOKEN", token)));
            }
            if let Some(expiration) = &summary.expiration {
                lines.push(export("AWS_CREDENTIAL_EXPIRATION", expiration));
            }
            lines.join("")
        }
    };
    Ok(out)
}

/// Single-quoted `export` line, safe for any value
fn export(name: &str, value: &str) -> String {
    format!("export {name}='{}'\n", value.replace('\'', r"'\''"))
}

fn render_error(error: &ResolveError) -> String {
    let attempts = error.attempts();
    if attempts.is_empty() {
        return format!("error: {error}\n");
    }

    let mut out = String::from("error: no credentials could be resolved\n");
    for (index, attempt) in attempts.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", index + 1, attempt.error));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stratus_credential::ProviderAttempt;
    use std::sync::Arc;

    fn sample() -> Credentials {
        Credentials::new("AKIDEXAMPLE", "it's-secret")
            .with_session_token("token")
            .with_provider_name("Environment")
    }

    #[test]
    fn test_text_hides_secrets() {
        let out = render(&sample(), OutputFormat::Text).unwrap();
        assert!(out.contains("AKIDEXAMPLE"));
        assert!(out.contains("Environment"));
        assert!(!out.contains("secret"));
    }

    #[test]
    fn test_json_summary() {
        let out = render(&sample(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["access_key_id"], "AKIDEXAMPLE");
        assert_eq!(value["session_token"], true);
        assert!(value["expiration"].is_null());
    }

    #[test]
    fn test_env_quotes_values() {
        let out = render(&sample(), OutputFormat::Env).unwrap();
        assert_eq!(
            out,
            "export AWS_ACCESS_KEY_ID='AKIDEXAMPLE'\n\
             export AWS_SECRET_ACCESS_KEY='it'\\''s-secret'\n\
             export AWS_SESSION_TOKEN='token'\n"
        );
    }

    #[test]
    fn test_error_lists_attempts() {
        let error = ResolveError::RefreshFailed {
            source: Arc::new(ResolveError::ChainExhausted {
                attempts: vec![ProviderAttempt {
                    provider: "Environment".to_string(),
                    error: ResolveError::not_applicable("Environment", "AWS_ACCESS_KEY_ID is not set"),
                }],
            }),
        };

        assert_eq!(
            render_error(&error),
            "error: no credentials could be resolved\n  1. Environment: not configured: AWS_ACCESS_KEY_ID is not set\n"
        );
    }
}
