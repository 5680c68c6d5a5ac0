//! Core configuration types and loading.

use super::defaults::*;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// The configured super-user.
    #[serde(default)]
    pub root: RootConfig,
    /// Token signing and revocation.
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address (default: 127.0.0.1:10088).
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Serve Prometheus metrics at `/metrics`.
    #[serde(default = "default_true")]
    pub metrics: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_format: LogFormat::default(),
            metrics: true,
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct RootConfig {
    #[serde(default = "default_root_user_name")]
    pub user_name: String,
    /// Required.
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_root_real_name")]
    pub real_name: String,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            user_name: default_root_user_name(),
            password: String::new(),
            real_name: default_root_real_name(),
        }
    }
}

impl std::fmt::Debug for RootConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootConfig")
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .field("real_name", &self.real_name)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct JwtConfig {
    /// HS256, HS384 or HS512.
    #[serde(default = "default_signing_method")]
    pub signing_method: String,
    #[serde(default = "default_signing_key")]
    pub signing_key: String,
    /// Token lifetime in seconds.
    #[serde(default = "default_expired")]
    pub expired: i64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// View claim used when a login request names none.
    #[serde(default = "default_view")]
    pub default_view: String,
    /// Revocation backend: "memory", "redb", "sqlite" or "none".
    #[serde(default = "default_store")]
    pub store: String,
    /// redb file path (required when `store = "redb"`).
    #[serde(default)]
    pub store_path: Option<String>,
    /// Seconds between expired-revocation purges.
    #[serde(default = "default_purge_interval")]
    pub purge_interval: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            signing_method: default_signing_method(),
            signing_key: default_signing_key(),
            expired: default_expired(),
            token_type: default_token_type(),
            default_view: default_view(),
            store: default_store(),
            store_path: None,
            purge_interval: default_purge_interval(),
        }
    }
}

impl JwtConfig {
    pub fn uses_insecure_key(&self) -> bool {
        self.signing_key == INSECURE_SIGNING_KEY
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("signing_method", &self.signing_method)
            .field("signing_key", &"<redacted>")
            .field("expired", &self.expired)
            .field("token_type", &self.token_type)
            .field("default_view", &self.default_view)
            .field("store", &self.store)
            .field("store_path", &self.store_path)
            .field("purge_interval", &self.purge_interval)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, or ":memory:".
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Deadlines for blocking boundaries, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_store_ms")]
    pub store_ms: u64,
    #[serde(default = "default_graph_ms")]
    pub graph_ms: u64,
    #[serde(default = "default_identity_ms")]
    pub identity_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            store_ms: default_store_ms(),
            graph_ms: default_graph_ms(),
            identity_ms: default_identity_ms(),
        }
    }
}

impl TimeoutsConfig {
    pub fn store(&self) -> Duration {
        Duration::from_millis(self.store_ms)
    }

    pub fn graph(&self) -> Duration {
        Duration::from_millis(self.graph_ms)
    }

    pub fn identity(&self) -> Duration {
        Duration::from_millis(self.identity_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.listen, default_listen());
        assert!(config.server.metrics);
        assert_eq!(config.server.log_format, LogFormat::Text);
        assert_eq!(config.root.user_name, "root");
        assert_eq!(config.jwt.signing_method, "HS512");
        assert_eq!(config.jwt.expired, 7200);
        assert_eq!(config.jwt.token_type, "Bearer");
        assert_eq!(config.jwt.store, "memory");
        assert!(config.jwt.uses_insecure_key());
        assert_eq!(config.database.path, "gatekeeper.db");
        assert_eq!(config.timeouts.identity(), Duration::from_secs(5));
    }

    #[test]
    fn parses_full_document() {
        let config: Config = toml::from_str(
            r#"
[server]
listen = "0.0.0.0:8080"
log_format = "json"
metrics = false

[root]
user_name = "admin"
password = "s3cret"
real_name = "Administrator"

[jwt]
signing_method = "HS256"
signing_key = "k"
expired = 60
store = "redb"
store_path = "/var/lib/gatekeeper/revoked.redb"

[database]
path = ":memory:"

[timeouts]
store_ms = 100
"#,
        )
        .unwrap();
        assert_eq!(config.server.log_format, LogFormat::Json);
        assert!(!config.server.metrics);
        assert_eq!(config.root.user_name, "admin");
        assert_eq!(config.jwt.expired, 60);
        assert_eq!(config.jwt.store_path.as_deref(), Some("/var/lib/gatekeeper/revoked.redb"));
        assert_eq!(config.timeouts.store(), Duration::from_millis(100));
        assert_eq!(config.timeouts.graph_ms, 2000);
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = Config::default();
        config.root.password = "hunter2".into();
        config.jwt.signing_key = "topsecret".into();
        let text = format!("{config:?}");
        assert!(!text.contains("hunter2"));
        assert!(!text.contains("topsecret"));
    }

    #[test]
    fn load_reports_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/gatekeeper.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
