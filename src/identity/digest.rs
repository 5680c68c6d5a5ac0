//! Credential digests.
//!
//! Stored credentials are the lowercase hex SHA-256 of the secret. The same
//! digest is used for storage and comparison.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub fn credential_digest(secret: &str) -> String {
    format!("{:x}", Sha256::digest(secret.as_bytes()))
}

/// Constant-time check of `secret` against a stored digest.
pub fn digest_matches(secret: &str, stored: &str) -> bool {
    let computed = credential_digest(secret);
    computed.as_bytes().ct_eq(stored.as_bytes()).into()
}
