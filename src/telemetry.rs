//! Telemetry utilities for request spans and safe token logging.

use crate::store::token_key;

/// Short digest prefix identifying a token in logs without revealing it.
pub fn token_fingerprint(token: &str) -> String {
    let mut key = token_key(token);
    key.truncate(12);
    key
}

/// Standardized span constructors for auth observability.
pub mod spans {
    use tracing::{Span, field, info_span};

    /// Create a span for an authenticated HTTP request. `subject` is
    /// recorded once the bearer token validates.
    pub fn request(method: &str, path: &str) -> Span {
        info_span!("request", method = %method, path = %path, subject = field::Empty)
    }

    /// Create a span for a login attempt.
    pub fn login(user_name: &str) -> Span {
        info_span!("login", user = %user_name)
    }

    /// Create a span for the periodic revocation purge.
    pub fn purge(backend: &str) -> Span {
        info_span!("purge", backend = %backend)
    }
}
