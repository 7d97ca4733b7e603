//! End-to-end behaviour of `DefaultChainProvider`

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use stratus_credential::{
    DefaultChainProvider, EngineOwnership, ErrorKind, Platform, ProvideCredentials,
    ResolveContext, ResolveError, StaticPlatform,
};
use stratus_http::testing::TestEngine;
use stratus_http::{EngineFactory, HttpEngine, HttpError, RetryConfig};

/// Fixed environment over the real filesystem
#[derive(Debug)]
struct TempHome {
    env: HashMap<String, String>,
}

impl TempHome {
    fn new(home: &Path) -> Self {
        let mut env = HashMap::new();
        env.insert("HOME".to_string(), home.display().to_string());
        env.insert("AWS_EC2_METADATA_DISABLED".to_string(), "true".to_string());
        Self { env }
    }
}

#[async_trait]
impl Platform for TempHome {
    fn env_var(&self, key: &str) -> Option<String> {
        self.env.get(key).cloned()
    }

    async fn read_file(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }
}

#[derive(Debug)]
struct SharedTestEngineFactory(Arc<TestEngine>);

impl EngineFactory for SharedTestEngineFactory {
    fn create(&self) -> Result<Arc<dyn HttpEngine>, HttpError> {
        Ok(self.0.clone())
    }
}

fn no_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 1,
        ..RetryConfig::default()
    }
}

fn isolated() -> StaticPlatform {
    StaticPlatform::new().with_env("AWS_EC2_METADATA_DISABLED", "true")
}

#[tokio::test]
async fn chain_order_is_fixed() {
    let provider = DefaultChainProvider::builder()
        .platform(Arc::new(isolated()))
        .http_engine(Arc::new(TestEngine::new()))
        .build()
        .unwrap();

    assert_eq!(
        provider.chain_names(),
        ["Environment", "Profile", "WebIdentityToken", "EcsContainer", "Imds"]
    );
}

#[tokio::test]
async fn environment_wins_over_profile() {
    let home = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(home.path().join(".aws")).unwrap();
    std::fs::write(
        home.path().join(".aws/credentials"),
        "[default]\naws_access_key_id = AKIDPROFILE\naws_secret_access_key = s\n",
    )
    .unwrap();

    let mut platform = TempHome::new(home.path());
    platform
        .env
        .insert("AWS_ACCESS_KEY_ID".to_string(), "AKIDENV".to_string());
    platform
        .env
        .insert("AWS_SECRET_ACCESS_KEY".to_string(), "s".to_string());

    let provider = DefaultChainProvider::builder()
        .platform(Arc::new(platform))
        .http_engine(Arc::new(TestEngine::new()))
        .build()
        .unwrap();

    let creds = provider.resolve(&ResolveContext::new()).await.unwrap();
    assert_eq!(creds.access_key_id(), "AKIDENV");
    assert_eq!(creds.provider_name(), Some("Environment"));
}

#[tokio::test]
async fn profile_files_on_disk_are_used() {
    let home = tempfile::tempdir().unwrap();
    let aws = home.path().join(".aws");
    std::fs::create_dir_all(&aws).unwrap();
    std::fs::write(aws.join("config"), "[profile dev]\nregion = eu-west-1\n").unwrap();
    std::fs::write(
        aws.join("credentials"),
        "[dev]\naws_access_key_id = AKIDDEV\naws_secret_access_key = s\n",
    )
    .unwrap();

    let provider = DefaultChainProvider::builder()
        .profile_name("dev")
        .platform(Arc::new(TempHome::new(home.path())))
        .http_engine(Arc::new(TestEngine::new()))
        .build()
        .unwrap();

    let creds = provider.resolve(&ResolveContext::new()).await.unwrap();
    assert_eq!(creds.access_key_id(), "AKIDDEV");
    assert_eq!(creds.provider_name(), Some("Profile"));
}

#[tokio::test]
async fn nothing_configured_lists_all_five_sources() {
    let engine = Arc::new(TestEngine::new());
    let provider = DefaultChainProvider::builder()
        .platform(Arc::new(isolated()))
        .http_engine(engine.clone())
        .build()
        .unwrap();

    let err = provider.resolve(&ResolveContext::new()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RefreshFailed);
    let providers: Vec<&str> = err.attempts().iter().map(|a| a.provider.as_str()).collect();
    assert_eq!(
        providers,
        ["Environment", "Profile", "WebIdentityToken", "EcsContainer", "Imds"]
    );
    assert!(
        err.attempts()
            .iter()
            .all(|a| a.error.kind() == ErrorKind::NotApplicable)
    );
    assert_eq!(engine.request_count(), 0);
}

#[tokio::test]
async fn misconfigured_web_identity_fails_at_resolve_not_build() {
    let platform = isolated().with_env("AWS_WEB_IDENTITY_TOKEN_FILE", "/var/run/token");

    let provider = DefaultChainProvider::builder()
        .platform(Arc::new(platform))
        .http_engine(Arc::new(TestEngine::new()))
        .build()
        .expect("construction never inspects credential sources");

    let err = provider.resolve(&ResolveContext::new()).await.unwrap_err();
    let web_identity = &err.attempts()[2];
    assert_eq!(web_identity.provider, "WebIdentityToken");
    assert_eq!(web_identity.error.kind(), ErrorKind::SourceFailure);
}

#[tokio::test]
async fn container_credentials_are_fetched_through_the_engine() {
    let engine = Arc::new(TestEngine::new());
    engine.push_status(
        200,
        r#"{"AccessKeyId":"ASIACONTAINER","SecretAccessKey":"s","Token":"t","Expiration":"2099-01-01T00:00:00Z"}"#,
    );
    let platform = isolated().with_env(
        "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI",
        "/v2/credentials/task",
    );

    let provider = DefaultChainProvider::builder()
        .platform(Arc::new(platform))
        .http_engine(engine.clone())
        .retry_config(no_retry())
        .build()
        .unwrap();

    let ctx = ResolveContext::new();
    let creds = provider.resolve(&ctx).await.unwrap();
    assert_eq!(creds.access_key_id(), "ASIACONTAINER");

    // Served from cache the second time
    provider.resolve(&ctx).await.unwrap();
    assert_eq!(engine.request_count(), 1);
    assert_eq!(
        engine.requests()[0].uri().to_string(),
        "http://169.254.170.2/v2/credentials/task"
    );
}

#[tokio::test]
async fn close_leaves_borrowed_engine_open() {
    let engine = Arc::new(TestEngine::new());
    let provider = DefaultChainProvider::builder()
        .platform(Arc::new(isolated()))
        .http_engine(engine.clone())
        .build()
        .unwrap();

    assert_eq!(provider.engine_ownership(), EngineOwnership::Borrowed);
    provider.close();
    provider.close();

    assert_eq!(engine.close_count(), 0);
    assert!(matches!(
        provider.resolve(&ResolveContext::new()).await,
        Err(ResolveError::Closed)
    ));
}

#[tokio::test]
async fn close_releases_owned_engine_exactly_once() {
    let engine = Arc::new(TestEngine::new());
    let provider = DefaultChainProvider::builder()
        .platform(Arc::new(isolated()))
        .engine_factory(Arc::new(SharedTestEngineFactory(engine.clone())))
        .build()
        .unwrap();

    assert_eq!(provider.engine_ownership(), EngineOwnership::Owned);
    provider.close();
    provider.close();
    provider.close();

    assert_eq!(engine.close_count(), 1);
    assert!(provider.is_closed());
}

#[tokio::test]
async fn invalid_cache_config_is_rejected() {
    let result = DefaultChainProvider::builder()
        .platform(Arc::new(isolated()))
        .http_engine(Arc::new(TestEngine::new()))
        .cache_config(stratus_credential::CacheConfig {
            refresh_margin: Duration::from_secs(10),
            default_ttl: Some(Duration::from_secs(5)),
        })
        .build();

    assert!(result.is_err());
}

