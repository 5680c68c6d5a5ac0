//! Token lifecycle: issue, validate, destroy, release.
//!
//! [`TokenAuthority`] is stateless across calls apart from its revocation
//! store handle. Validation runs in two gates:
//!
//! 1. Structural: signature, algorithm family, `nbf <= now < exp`.
//! 2. Revocation: only after the structural gate passes, the store is asked
//!    whether the token was destroyed. The store is the authoritative gate.
//!
//! With no store configured, destroyed tokens stay valid until natural
//! expiry. That mode is an explicit configuration choice.

mod codec;

pub use codec::{Claims, CodecError, HmacCodec, TokenCodec, parse_method};

use crate::clock::Clock;
use crate::error::AuthError;
use crate::metrics;
use crate::store::{RevocationStore, StoreError};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default token lifetime in seconds.
pub const DEFAULT_EXPIRY_SECS: i64 = 7200;

/// Default token type label.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Token payload returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub access_token: String,
    pub token_type: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// Issues, validates and revokes bearer tokens.
pub struct TokenAuthority {
    codec: Arc<dyn TokenCodec>,
    store: Option<Arc<dyn RevocationStore>>,
    clock: Arc<dyn Clock>,
    expiry_secs: i64,
    token_type: String,
    store_timeout: Duration,
}

impl TokenAuthority {
    /// Store calls are bounded by this deadline unless configured otherwise.
    pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

    pub fn new(codec: Arc<dyn TokenCodec>, clock: Arc<dyn Clock>) -> Self {
        Self {
            codec,
            store: None,
            clock,
            expiry_secs: DEFAULT_EXPIRY_SECS,
            token_type: DEFAULT_TOKEN_TYPE.to_string(),
            store_timeout: Self::DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn RevocationStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_expiry(mut self, secs: i64) -> Self {
        self.expiry_secs = secs;
        self
    }

    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = token_type.into();
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn expiry_secs(&self) -> i64 {
        self.expiry_secs
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Issue a token for `subject_id` carrying `view`.
    pub fn issue(&self, subject_id: &str, view: &str) -> Result<TokenInfo, AuthError> {
        let now = self.clock.now();
        let expires_at = now.saturating_add(self.expiry_secs);
        let claims = Claims {
            sub: subject_id.to_string(),
            view: view.to_string(),
            iat: now,
            exp: expires_at,
            nbf: now,
            jti: uuid::Uuid::new_v4().simple().to_string(),
        };

        let access_token = self.codec.encode(&claims).map_err(|e| {
            warn!(subject = %subject_id, error = %e, "Token signing failed");
            AuthError::Signing(e.to_string())
        })?;

        metrics::record_token_issued();
        debug!(subject = %subject_id, view = %view, expires_at, "Token issued");

        Ok(TokenInfo {
            access_token,
            token_type: self.token_type.clone(),
            issued_at: now,
            expires_at,
        })
    }

    /// Validate `token` and return `(subject_id, view)`.
    pub async fn validate(&self, token: &str) -> Result<(String, String), AuthError> {
        let claims = self.decode_current(token)?;

        if let Some(store) = &self.store {
            let revoked = self.bounded(store.check(token)).await?;
            if revoked {
                metrics::record_token_rejected("revoked");
                debug!(subject = %claims.sub, "Rejected revoked token");
                return Err(AuthError::InvalidToken);
            }
        }

        Ok((claims.sub, claims.view))
    }

    /// Revoke `token` until its natural expiry.
    ///
    /// Destroying an authentic token that has already expired, or destroying
    /// the same token twice, succeeds.
    pub async fn destroy(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.decode_authentic(token)?;

        let Some(store) = &self.store else {
            debug!(subject = %claims.sub, "No revocation store configured; destroy is a no-op");
            return Ok(());
        };

        let remaining = claims.exp.saturating_sub(self.clock.now());
        if remaining <= 0 {
            return Ok(());
        }

        self.bounded(store.set(token, Duration::from_secs(remaining as u64)))
            .await?;
        metrics::record_token_revoked();
        info!(subject = %claims.sub, remaining_secs = remaining, "Token revoked");
        Ok(())
    }

    /// Drop expired revocation entries. Returns the number removed.
    pub async fn purge_revoked(&self) -> Result<usize, AuthError> {
        match &self.store {
            Some(store) => Ok(self.bounded(store.purge_expired()).await?),
            None => Ok(0),
        }
    }

    /// Close the underlying store. Called once at teardown.
    pub async fn release(&self) -> Result<(), AuthError> {
        if let Some(store) = &self.store {
            store.close().await?;
        }
        Ok(())
    }

    /// Signature and structure only.
    fn decode_authentic(&self, token: &str) -> Result<Claims, AuthError> {
        if token.is_empty() {
            metrics::record_token_rejected("empty");
            return Err(AuthError::InvalidToken);
        }
        self.codec.decode(token).map_err(|e| {
            metrics::record_token_rejected("malformed");
            debug!(error = %e, "Rejected token");
            AuthError::InvalidToken
        })
    }

    /// Signature, structure and validity window.
    fn decode_current(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.decode_authentic(token)?;
        let now = self.clock.now();
        if now < claims.nbf {
            metrics::record_token_rejected("not_yet_valid");
            return Err(AuthError::InvalidToken);
        }
        if now >= claims.exp {
            metrics::record_token_rejected("expired");
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.store_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout(self.store_timeout))?
    }
}
