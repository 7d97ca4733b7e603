//! Stratus Log
//!
//! Thin bootstrap over `tracing-subscriber` used by the `stratus` binary and by
//! integration tests that want readable output. Library crates in this workspace
//! only emit events through `tracing`; they never install a subscriber.
//!
//! ```no_run
//! use stratus_log::{Config, LoggerBuilder};
//!
//! let _guard = LoggerBuilder::from_config(Config::development()).build()?;
//! tracing::info!("ready");
//! # Ok::<(), stratus_log::LogError>(())
//! ```

#![forbid(unsafe_code)]

mod builder;
pub mod config;
mod error;

pub use builder::{LoggerBuilder, LoggerGuard};
pub use config::{Config, DisplayConfig, Format};
pub use error::{LogError, LogResult};

/// Initialise logging from `STRATUS_LOG` / `RUST_LOG` and `STRATUS_LOG_FORMAT`.
pub fn init() -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(Config::from_env()).build()
}
