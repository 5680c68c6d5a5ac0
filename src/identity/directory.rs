//! Directory-backed credential strategy.
//!
//! The transport is supplied by the integrator through [`DirectoryClient`]:
//! a service-account bind, one subtree search for the user, then a bind as
//! the found entry with the presented password.

use super::{DelegatedVerifier, Subject};
use crate::error::AuthError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Default)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .get(attribute)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// One open directory connection.
#[async_trait]
pub trait DirectorySession: Send {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError>;

    /// Subtree search under `base` returning `attributes` of each match.
    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryEntry>, DirectoryError>;
}

#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn DirectorySession>, DirectoryError>;
}

#[derive(Clone)]
pub struct DirectorySettings {
    pub bind_dn: String,
    pub bind_password: Zeroizing<String>,
    pub base_dn: String,
    /// Search filter; `{username}` is replaced by the escaped login name.
    pub user_filter: String,
    /// Attribute holding the display name.
    pub display_attribute: String,
}

impl DirectorySettings {
    pub const DEFAULT_USER_FILTER: &'static str =
        "(&(objectClass=organizationalPerson)(uid={username}))";

    pub fn new(
        bind_dn: impl Into<String>,
        bind_password: impl Into<String>,
        base_dn: impl Into<String>,
    ) -> Self {
        Self {
            bind_dn: bind_dn.into(),
            bind_password: Zeroizing::new(bind_password.into()),
            base_dn: base_dn.into(),
            user_filter: Self::DEFAULT_USER_FILTER.to_string(),
            display_attribute: "cn".to_string(),
        }
    }

    fn filter_for(&self, user_name: &str) -> String {
        self.user_filter
            .replace("{username}", &escape_filter_value(user_name))
    }
}

/// Escape a value for use inside a search filter (RFC 4515).
pub fn escape_filter_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '*' => out.push_str("\\2a"),
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '\\' => out.push_str("\\5c"),
            '\0' => out.push_str("\\00"),
            c => out.push(c),
        }
    }
    out
}

pub struct DirectoryVerifier {
    client: Arc<dyn DirectoryClient>,
    settings: DirectorySettings,
}

impl DirectoryVerifier {
    pub fn new(client: Arc<dyn DirectoryClient>, settings: DirectorySettings) -> Self {
        Self { client, settings }
    }
}

fn unavailable(e: DirectoryError) -> AuthError {
    AuthError::IdentityUnavailable(e.to_string())
}

#[async_trait]
impl DelegatedVerifier for DirectoryVerifier {
    fn name(&self) -> &'static str {
        "directory"
    }

    async fn verify(&self, user_name: &str, password: &str) -> Result<Subject, AuthError> {
        // An empty password would be an unauthenticated bind.
        if password.is_empty() {
            return Err(AuthError::InvalidPassword);
        }

        let mut session = self.client.connect().await.map_err(unavailable)?;
        session
            .bind(&self.settings.bind_dn, &self.settings.bind_password)
            .await
            .map_err(|e| {
                warn!(error = %e, "Directory service bind failed");
                unavailable(e)
            })?;

        let filter = self.settings.filter_for(user_name);
        let attributes = ["dn", self.settings.display_attribute.as_str()];
        let mut entries = session
            .search(&self.settings.base_dn, &filter, &attributes)
            .await
            .map_err(unavailable)?;

        if entries.len() != 1 {
            return Err(AuthError::InvalidUser);
        }
        let entry = entries.remove(0);

        match session.bind(&entry.dn, password).await {
            Ok(()) => {}
            Err(DirectoryError::InvalidCredentials) => return Err(AuthError::InvalidPassword),
            Err(e) => return Err(unavailable(e)),
        }

        let display_name = entry
            .first(&self.settings.display_attribute)
            .unwrap_or(user_name)
            .to_string();
        Ok(Subject::user(user_name, display_name))
    }
}
