//! Login orchestration.
//!
//! Ties identity verification, token issuance and permission resolution
//! together for the operations the HTTP layer exposes.

use crate::error::AuthError;
use crate::graph::{GraphError, GraphReader, Role, RoleId, UserRecord, UserStore, with_deadline};
use crate::identity::{IdentityVerifier, RootAccount, Subject, credential_digest, digest_matches};
use crate::metrics;
use crate::permission::{MenuTree, PermissionResolver};
use crate::token::{TokenAuthority, TokenInfo};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Profile of the logged-in subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserLoginInfo {
    pub user_id: String,
    pub user_name: String,
    pub real_name: String,
    pub roles: Vec<Role>,
}

pub struct LoginService {
    identity: IdentityVerifier,
    tokens: Arc<TokenAuthority>,
    resolver: PermissionResolver,
    graph: Arc<dyn GraphReader>,
    users: Arc<dyn UserStore>,
    root: Arc<RootAccount>,
    default_view: String,
    timeout: Duration,
}

impl LoginService {
    pub const DEFAULT_VIEW: &'static str = "global";

    pub fn new(
        identity: IdentityVerifier,
        tokens: Arc<TokenAuthority>,
        resolver: PermissionResolver,
        graph: Arc<dyn GraphReader>,
        users: Arc<dyn UserStore>,
        root: Arc<RootAccount>,
    ) -> Self {
        Self {
            identity,
            tokens,
            resolver,
            graph,
            users,
            root,
            default_view: Self::DEFAULT_VIEW.to_string(),
            timeout: PermissionResolver::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_default_view(mut self, view: impl Into<String>) -> Self {
        self.default_view = view.into();
        self
    }

    /// Deadline for user and role reads.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn tokens(&self) -> &Arc<TokenAuthority> {
        &self.tokens
    }

    async fn read<T>(
        &self,
        fut: impl Future<Output = Result<T, GraphError>>,
    ) -> Result<T, AuthError> {
        Ok(with_deadline(self.timeout, fut).await?)
    }

    /// Verify credentials and issue a token scoped to `view`.
    pub async fn login(
        &self,
        user_name: &str,
        password: &str,
        view: Option<&str>,
    ) -> Result<(Subject, TokenInfo), AuthError> {
        let subject = match self.identity.verify(user_name, password).await {
            Ok(subject) => subject,
            Err(e) => {
                metrics::record_login(e.error_code());
                warn!(user = %user_name, error = %e, "Login failed");
                return Err(e);
            }
        };

        let view = view.unwrap_or(self.default_view.as_str());
        let token = self.tokens.issue(&subject.id, view)?;
        metrics::record_login("ok");
        info!(
            subject = %subject.id,
            view = %view,
            super_user = subject.is_super_user,
            "Login succeeded"
        );
        Ok((subject, token))
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.tokens.destroy(token).await
    }

    /// Issue a fresh token for an authenticated subject.
    pub async fn refresh_token(&self, subject_id: &str, view: &str) -> Result<TokenInfo, AuthError> {
        if !self.root.is_root_id(subject_id) {
            self.checked_user(subject_id).await?;
        }
        self.tokens.issue(subject_id, view)
    }

    /// The stored record for `subject_id`, which must exist and be enabled.
    pub async fn checked_user(&self, subject_id: &str) -> Result<UserRecord, AuthError> {
        let user = self
            .read(self.users.get(subject_id))
            .await?
            .ok_or(AuthError::InvalidUser)?;
        if !user.status.is_enabled() {
            return Err(AuthError::UserDisabled);
        }
        Ok(user)
    }

    pub async fn current_subject(&self, subject_id: &str) -> Result<Subject, AuthError> {
        if self.root.is_root_id(subject_id) {
            return Ok(self.root.subject());
        }
        let user = self.checked_user(subject_id).await?;
        Ok(Subject::user(user.id, user.real_name))
    }

    pub async fn login_info(&self, subject_id: &str) -> Result<UserLoginInfo, AuthError> {
        if self.root.is_root_id(subject_id) {
            return Ok(UserLoginInfo {
                user_id: String::new(),
                user_name: self.root.user_name().to_string(),
                real_name: self.root.real_name().to_string(),
                roles: Vec::new(),
            });
        }

        let user = self.checked_user(subject_id).await?;
        let role_ids: Vec<RoleId> = self
            .read(self.graph.user_roles(subject_id))
            .await?
            .into_iter()
            .map(|b| b.role_id)
            .collect();
        let roles = if role_ids.is_empty() {
            Vec::new()
        } else {
            self.read(self.graph.roles_by_ids(&role_ids, true)).await?
        };

        Ok(UserLoginInfo {
            user_id: user.id,
            user_name: user.user_name,
            real_name: user.real_name,
            roles,
        })
    }

    pub async fn menu_tree(&self, subject_id: &str) -> Result<Vec<MenuTree>, AuthError> {
        let subject = self.resolver.subject_for(subject_id);
        self.resolver.resolve(&subject).await
    }

    /// Rotate the stored credential after re-verifying the old one.
    pub async fn change_password(
        &self,
        subject_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if self.root.is_root_id(subject_id) {
            return Err(AuthError::RootCredentialImmutable);
        }
        let user = self.checked_user(subject_id).await?;
        if !digest_matches(old_password, &user.password) {
            warn!(subject = %subject_id, "Credential change rejected: old credential mismatch");
            return Err(AuthError::InvalidOldCredential);
        }
        self.read(
            self.users
                .update_password(subject_id, &credential_digest(new_password)),
        )
        .await?;
        info!(subject = %subject_id, "Credential changed");
        Ok(())
    }
}
