//! The configured super-user account.
//!
//! The super-user is configuration, not a stored record: its credential
//! cannot be rotated at runtime and its id is its user name.

use super::Subject;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

pub struct RootAccount {
    user_name: String,
    password: Zeroizing<String>,
    real_name: String,
}

impl RootAccount {
    pub fn new(
        user_name: impl Into<String>,
        password: impl Into<String>,
        real_name: impl Into<String>,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            password: Zeroizing::new(password.into()),
            real_name: real_name.into(),
        }
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn real_name(&self) -> &str {
        &self.real_name
    }

    /// Whether `subject_id` names the super-user.
    pub fn is_root_id(&self, subject_id: &str) -> bool {
        subject_id == self.user_name
    }

    pub fn subject(&self) -> Subject {
        Subject {
            id: self.user_name.clone(),
            display_name: self.real_name.clone(),
            is_super_user: true,
        }
    }

    /// Compare credentials without short-circuiting between the two fields.
    pub fn verify(&self, user_name: &str, password: &str) -> Option<Subject> {
        if self.password.is_empty() {
            return None;
        }
        let name_ok = user_name.as_bytes().ct_eq(self.user_name.as_bytes());
        let password_ok = password.as_bytes().ct_eq(self.password.as_bytes());
        if bool::from(name_ok & password_ok) {
            Some(self.subject())
        } else {
            None
        }
    }
}

impl std::fmt::Debug for RootAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootAccount")
            .field("user_name", &self.user_name)
            .field("real_name", &self.real_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_only_exact_credentials() {
        let root = RootAccount::new("root", "s3cret", "Super Admin");
        let subject = root.verify("root", "s3cret").unwrap();
        assert!(subject.is_super_user);
        assert_eq!(subject.id, "root");
        assert_eq!(subject.display_name, "Super Admin");

        assert!(root.verify("root", "s3cre").is_none());
        assert!(root.verify("Root", "s3cret").is_none());
        assert!(root.verify("alice", "s3cret").is_none());
    }

    #[test]
    fn empty_password_never_matches() {
        let root = RootAccount::new("root", "", "Super Admin");
        assert!(root.verify("root", "").is_none());
    }

    #[test]
    fn debug_hides_password() {
        let root = RootAccount::new("root", "s3cret", "Super Admin");
        assert!(!format!("{root:?}").contains("s3cret"));
        assert!(root.is_root_id("root"));
        assert!(!root.is_root_id("alice"));
    }
}
