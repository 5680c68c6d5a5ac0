//! Identity verification.
//!
//! Credentials are checked in a fixed order:
//!
//! 1. [`RootAccount`]: a pure local comparison against the configured
//!    super-user. No external call.
//! 2. A [`DelegatedVerifier`] strategy, bounded by a deadline:
//!    - [`DatabaseVerifier`] compares against stored credential digests.
//!    - [`DirectoryVerifier`] binds against an external directory.
//!
//! The delegated step runs only if the super-user comparison does not match.
//! A delegated identity whose id equals the super-user's is refused: tokens
//! carry only the subject id, so it would be indistinguishable from root.

use crate::error::AuthError;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub mod database;
pub mod digest;
pub mod directory;
pub mod root;

pub use database::DatabaseVerifier;
pub use digest::{credential_digest, digest_matches};
pub use directory::{
    DirectoryClient, DirectoryEntry, DirectoryError, DirectorySession, DirectorySettings,
    DirectoryVerifier,
};
pub use root::RootAccount;

/// A verified identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subject {
    pub id: String,
    pub display_name: String,
    pub is_super_user: bool,
}

impl Subject {
    pub fn user(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            is_super_user: false,
        }
    }
}

/// An external identity strategy.
#[async_trait]
pub trait DelegatedVerifier: Send + Sync {
    /// Strategy name for logging.
    fn name(&self) -> &'static str;

    /// Map `(user_name, password)` to exactly one verified subject.
    ///
    /// Absence and ambiguity both fail with [`AuthError::InvalidUser`]; a
    /// rejected credential fails with [`AuthError::InvalidPassword`]; a
    /// transport failure fails with [`AuthError::IdentityUnavailable`].
    async fn verify(&self, user_name: &str, password: &str) -> Result<Subject, AuthError>;
}

/// Super-user short-circuit followed by a delegated strategy.
pub struct IdentityVerifier {
    root: Arc<RootAccount>,
    delegated: Arc<dyn DelegatedVerifier>,
    timeout: Duration,
}

impl IdentityVerifier {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(root: Arc<RootAccount>, delegated: Arc<dyn DelegatedVerifier>) -> Self {
        Self {
            root,
            delegated,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn verify_root(&self, user_name: &str, password: &str) -> Option<Subject> {
        self.root.verify(user_name, password)
    }

    pub async fn verify_delegated(
        &self,
        user_name: &str,
        password: &str,
    ) -> Result<Subject, AuthError> {
        let strategy = self.delegated.name();
        let result = tokio::time::timeout(self.timeout, self.delegated.verify(user_name, password))
            .await
            .map_err(|_| {
                warn!(strategy, timeout = ?self.timeout, "Identity verification timed out");
                AuthError::IdentityUnavailable(format!("{strategy} timed out"))
            })?;

        match result {
            Ok(subject) if self.root.is_root_id(&subject.id) => {
                warn!(
                    strategy,
                    subject = %subject.id,
                    "Delegated identity collides with the super-user id; refused"
                );
                Err(AuthError::InvalidUser)
            }
            Ok(subject) => {
                debug!(strategy, subject = %subject.id, "Identity verified");
                Ok(subject)
            }
            Err(e) => {
                debug!(strategy, user = %user_name, error = %e, "Identity rejected");
                Err(e)
            }
        }
    }

    /// Root first, then the delegated strategy.
    pub async fn verify(&self, user_name: &str, password: &str) -> Result<Subject, AuthError> {
        if let Some(subject) = self.verify_root(user_name, password) {
            debug!(subject = %subject.id, "Super-user verified");
            return Ok(subject);
        }
        self.verify_delegated(user_name, password).await
    }
}
