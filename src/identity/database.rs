//! Stored-digest credential strategy.

use super::{DelegatedVerifier, Subject, digest_matches};
use crate::error::AuthError;
use crate::graph::UserStore;
use async_trait::async_trait;
use std::sync::Arc;

/// Verifies credentials against [`UserStore`] records.
pub struct DatabaseVerifier {
    users: Arc<dyn UserStore>,
}

impl DatabaseVerifier {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl DelegatedVerifier for DatabaseVerifier {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn verify(&self, user_name: &str, password: &str) -> Result<Subject, AuthError> {
        let mut matches = self
            .users
            .find_by_name(user_name)
            .await
            .map_err(|e| AuthError::IdentityUnavailable(e.to_string()))?;

        if matches.len() != 1 {
            return Err(AuthError::InvalidUser);
        }
        let user = matches.remove(0);

        if !digest_matches(password, &user.password) {
            return Err(AuthError::InvalidPassword);
        }
        if !user.status.is_enabled() {
            return Err(AuthError::UserDisabled);
        }

        Ok(Subject::user(user.id, user.real_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{MemoryGraph, Status, UserRecord};
    use crate::identity::credential_digest;

    fn user(id: &str, name: &str, password: &str, status: Status) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            user_name: name.to_string(),
            real_name: format!("{name} real"),
            password: credential_digest(password),
            status,
        }
    }

    fn verifier() -> DatabaseVerifier {
        let graph = MemoryGraph::new()
            .with_user(user("u1", "alice", "pw", Status::Enabled))
            .with_user(user("u2", "bob", "pw", Status::Disabled))
            .with_user(user("u3", "twin", "pw", Status::Enabled))
            .with_user(user("u4", "twin", "pw", Status::Enabled));
        DatabaseVerifier::new(Arc::new(graph))
    }

    #[tokio::test]
    async fn stored_user_with_root_id_cannot_log_in() {
        use crate::identity::{IdentityVerifier, RootAccount};

        let graph = MemoryGraph::new().with_user(user("root", "admin", "pw", Status::Enabled));
        let identity = IdentityVerifier::new(
            Arc::new(RootAccount::new("root", "toor", "Super Admin")),
            Arc::new(DatabaseVerifier::new(Arc::new(graph))),
        );
        assert!(matches!(
            identity.verify("admin", "pw").await,
            Err(AuthError::InvalidUser)
        ));
    }

    #[tokio::test]
    async fn verifies_stored_user() {
        let subject = verifier().verify("alice", "pw").await.unwrap();
        assert_eq!(subject.id, "u1");
        assert_eq!(subject.display_name, "alice real");
        assert!(!subject.is_super_user);
    }

    #[tokio::test]
    async fn rejects_unknown_ambiguous_wrong_and_disabled() {
        let v = verifier();
        assert!(matches!(v.verify("carol", "pw").await, Err(AuthError::InvalidUser)));
        assert!(matches!(v.verify("twin", "pw").await, Err(AuthError::InvalidUser)));
        assert!(matches!(
            v.verify("alice", "nope").await,
            Err(AuthError::InvalidPassword)
        ));
        assert!(matches!(v.verify("bob", "pw").await, Err(AuthError::UserDisabled)));
    }
}
