//! Logger builder implementation

use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Format};
use crate::error::{LogError, LogResult};

/// Logger builder
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
}

/// Guard that keeps the logger's root span alive
///
/// Drop it at the end of `main`.
#[derive(Debug)]
pub struct LoggerGuard {
    #[allow(dead_code)]
    root_span: Option<tracing::span::EnteredSpan>,
}

/// Build a `fmt` layer with the shared display options applied.
macro_rules! fmt_layer {
    ($format:ident, $display:expr) => {
        tracing_subscriber::fmt::layer()
            .$format()
            .with_writer(std::io::stderr)
            .with_ansi($display.colors)
            .with_target($display.target)
            .with_file($display.source)
            .with_line_number($display.source)
    };
}

impl LoggerBuilder {
    /// Create builder from config
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Build and install the global subscriber
    ///
    /// # Errors
    ///
    /// Returns error if the filter cannot be parsed or a subscriber is
    /// already installed.
    pub fn build(self) -> LogResult<LoggerGuard> {
        let filter = EnvFilter::try_new(&self.config.level).map_err(|e| LogError::Filter {
            filter: self.config.level.clone(),
            reason: e.to_string(),
        })?;

        let display = self.config.display;
        let installed = match self.config.format {
            Format::Pretty => Registry::default()
                .with(filter)
                .with(fmt_layer!(pretty, display))
                .try_init(),
            Format::Compact => Registry::default()
                .with(filter)
                .with(fmt_layer!(compact, display))
                .try_init(),
            Format::Json => Registry::default()
                .with(filter)
                .with(
                    fmt_layer!(json, display)
                        .with_current_span(true)
                        .flatten_event(display.flatten),
                )
                .try_init(),
        };
        installed.map_err(|e| LogError::AlreadyInitialized(e.to_string()))?;

        let root_span = self
            .config
            .service
            .as_deref()
            .map(|service| tracing::info_span!("service", name = service).entered());

        Ok(LoggerGuard { root_span })
    }
}
