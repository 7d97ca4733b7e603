//! Concrete credential sources
//!
//! Each provider answers `NotApplicable` when its configuration is absent
//! so a chain can move on to the next source.

pub mod ecs;
pub mod env;
pub mod imds;
pub mod profile;
pub mod web_identity;

mod document;

pub use ecs::EcsProvider;
pub use env::EnvironmentProvider;
pub use imds::ImdsProvider;
pub use profile::ProfileProvider;
pub use web_identity::{WebIdentityConfig, WebIdentityProvider};

use stratus_http::{HttpResponse, http::HeaderValue};

/// First bytes of a response body, for error messages
pub(crate) fn body_excerpt(response: &HttpResponse) -> String {
    const LIMIT: usize = 256;
    let body = String::from_utf8_lossy(response.body());
    let trimmed = body.trim();
    match trimmed.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

pub(crate) fn header_value(value: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(value).ok()
}
