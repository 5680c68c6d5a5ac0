//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use crate::token::parse_method;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("root.password is required")]
    MissingRootPassword,
    #[error("root.user_name is required")]
    MissingRootUserName,
    #[error("jwt.signing_key is required")]
    MissingSigningKey,
    #[error("jwt.signing_method must be HS256, HS384 or HS512, got '{0}'")]
    UnsupportedSigningMethod(String),
    #[error("jwt.expired must be positive, got {0}")]
    InvalidExpiry(i64),
    #[error("jwt.store must be memory, redb, sqlite or none, got '{0}'")]
    UnknownStore(String),
    #[error("jwt.store_path is required when jwt.store = \"redb\"")]
    MissingStorePath,
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.root.user_name.is_empty() {
        errors.push(ValidationError::MissingRootUserName);
    }
    if config.root.password.is_empty() {
        errors.push(ValidationError::MissingRootPassword);
    }

    let jwt = &config.jwt;
    if jwt.signing_key.is_empty() {
        errors.push(ValidationError::MissingSigningKey);
    }
    if parse_method(&jwt.signing_method).is_err() {
        errors.push(ValidationError::UnsupportedSigningMethod(
            jwt.signing_method.clone(),
        ));
    }
    if jwt.expired <= 0 {
        errors.push(ValidationError::InvalidExpiry(jwt.expired));
    }
    match jwt.store.as_str() {
        "memory" | "sqlite" | "none" => {}
        "redb" => {
            if jwt.store_path.as_deref().is_none_or(str::is_empty) {
                errors.push(ValidationError::MissingStorePath);
            }
        }
        other => errors.push(ValidationError::UnknownStore(other.to_string())),
    }

    if config.database.path != ":memory:" {
        let db_path = Path::new(&config.database.path);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::DatabasePathInvalid(
                config.database.path.clone(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
