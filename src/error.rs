//! Unified error handling for gatekeeper.
//!
//! Every failure the auth core can report is a distinct [`AuthError`]
//! variant. Storage failures keep their backend error intact so callers can
//! tell an authorization decision apart from a transient fault.

use crate::graph::GraphError;
use crate::store::StoreError;
use axum::http::StatusCode;
use thiserror::Error;

/// Generic message for credential failures that must not reveal which check failed.
const AUTHENTICATION_FAILED: &str = "invalid username or password";

/// Errors produced by token, identity and permission operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed, expired, not-yet-valid or revoked token.
    #[error("invalid token")]
    InvalidToken,

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("invalid user")]
    InvalidUser,

    #[error("invalid password")]
    InvalidPassword,

    #[error("old credential does not match")]
    InvalidOldCredential,

    #[error("user is disabled")]
    UserDisabled,

    #[error("the super-user credential is managed by configuration")]
    RootCredentialImmutable,

    /// Authenticated subject has nothing visible.
    #[error("no permission")]
    NoPermission,

    #[error("identity service unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("revocation store error: {0}")]
    Store(#[from] StoreError),

    #[error("graph read error: {0}")]
    Graph(#[from] GraphError),
}

impl AuthError {
    /// Get a static error code string for metrics labeling and API payloads.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidToken => "invalid_token",
            Self::Signing(_) => "signing_error",
            Self::InvalidUser => "invalid_user",
            Self::InvalidPassword => "invalid_password",
            Self::InvalidOldCredential => "invalid_old_credential",
            Self::UserDisabled => "user_disabled",
            Self::RootCredentialImmutable => "root_credential_immutable",
            Self::NoPermission => "no_permission",
            Self::IdentityUnavailable(_) => "identity_unavailable",
            Self::Store(_) | Self::Graph(_) => "storage_error",
        }
    }

    /// Whether a caller may retry the same operation with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::IdentityUnavailable(_) | Self::Store(_) | Self::Graph(_)
        )
    }

    /// HTTP status class for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::InvalidUser
            | Self::InvalidPassword
            | Self::InvalidOldCredential
            | Self::UserDisabled
            | Self::RootCredentialImmutable => StatusCode::BAD_REQUEST,
            Self::NoPermission => StatusCode::FORBIDDEN,
            Self::IdentityUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Signing(_) | Self::Store(_) | Self::Graph(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show an external caller.
    ///
    /// Unknown user and wrong password collapse into one message; internal
    /// faults never expose backend detail.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidUser | Self::InvalidPassword => AUTHENTICATION_FAILED.to_string(),
            Self::Signing(_) | Self::Store(_) | Self::Graph(_) => {
                "internal server error".to_string()
            }
            Self::IdentityUnavailable(_) => "identity service unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AuthError::InvalidToken.error_code(), "invalid_token");
        assert_eq!(AuthError::NoPermission.error_code(), "no_permission");
        assert_eq!(
            AuthError::Store(StoreError::Closed).error_code(),
            "storage_error"
        );
        assert_eq!(
            AuthError::Graph(GraphError::NotFound("menu m1".into())).error_code(),
            "storage_error"
        );
    }

    #[test]
    fn test_credential_failures_share_public_message() {
        assert_eq!(
            AuthError::InvalidUser.public_message(),
            AuthError::InvalidPassword.public_message()
        );
        assert_ne!(AuthError::InvalidUser.to_string(), AuthError::InvalidPassword.to_string());
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let err = AuthError::Store(StoreError::Database("disk full at /var/lib".into()));
        assert!(!err.public_message().contains("disk"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_no_permission_is_client_error() {
        assert_eq!(AuthError::NoPermission.status(), StatusCode::FORBIDDEN);
        assert!(!AuthError::NoPermission.is_retryable());
        assert_eq!(AuthError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
    }
}
