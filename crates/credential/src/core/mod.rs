//! Core types for credential resolution

mod context;
mod credentials;
mod error;
mod secret;
mod time;

pub use context::ResolveContext;
pub use credentials::Credentials;
pub use error::{ConfigError, ErrorKind, ProviderAttempt, ResolveError};
pub use secret::SecretString;
pub use time::{Clock, ManualClock, SystemClock};

pub(crate) use time::to_time_delta;
