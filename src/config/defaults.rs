//! Default value functions for configuration.

use std::net::SocketAddr;

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 10088))
}

// =============================================================================
// Root Defaults
// =============================================================================

pub fn default_root_user_name() -> String {
    "root".to_string()
}

pub fn default_root_real_name() -> String {
    "Super Admin".to_string()
}

// =============================================================================
// JWT Defaults
// =============================================================================

/// Well-known development key. The daemon refuses it unless explicitly allowed.
pub const INSECURE_SIGNING_KEY: &str = "gin-admin";

pub fn default_signing_method() -> String {
    "HS512".to_string()
}

pub fn default_signing_key() -> String {
    INSECURE_SIGNING_KEY.to_string()
}

pub fn default_expired() -> i64 {
    crate::token::DEFAULT_EXPIRY_SECS
}

pub fn default_token_type() -> String {
    crate::token::DEFAULT_TOKEN_TYPE.to_string()
}

pub fn default_view() -> String {
    "global".to_string()
}

pub fn default_store() -> String {
    "memory".to_string()
}

pub fn default_purge_interval() -> u64 {
    300
}

// =============================================================================
// Database Defaults
// =============================================================================

pub fn default_database_path() -> String {
    "gatekeeper.db".to_string()
}

// =============================================================================
// Timeout Defaults (milliseconds)
// =============================================================================

pub fn default_store_ms() -> u64 {
    2000
}

pub fn default_graph_ms() -> u64 {
    2000
}

pub fn default_identity_ms() -> u64 {
    5000
}
