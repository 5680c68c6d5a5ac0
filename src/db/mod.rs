//! Database module for persistent storage.
//!
//! Provides async SQLite database access using SQLx for:
//! - Menus, menu actions, roles and their bindings (graph reads)
//! - User accounts and credential rotation
//! - The `revoked_tokens` table used by [`crate::store::SqliteStore`]
//!
//! The graph is administered elsewhere; this crate only reads it, apart
//! from replacing a user's credential digest.

mod menus;
mod users;

pub use menus::MenuRepository;
pub use users::UserRepository;

use crate::graph::{
    ActionId, GraphError, GraphReader, Menu, MenuAction, MenuFilter, MenuId, Role, RoleId,
    RoleMenuBinding, UserRecord, UserRoleBinding, UserStore,
};
use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("integrity check failed: {0}")]
    Integrity(String),
}

/// Database handle with connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Open the database at `path` and apply migrations.
    ///
    /// `":memory:"` opens a private in-memory database.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let pool = if path == ":memory:" {
            Self::connect_memory().await?
        } else {
            Self::connect_file(path).await?
        };
        info!(path = %path, "Database connected");

        Self::run_migrations(&pool).await?;
        Self::check_integrity(&pool).await?;
        Ok(Self { pool })
    }

    /// One connection to a uniquely named shared-cache database, kept alive
    /// for the life of the pool.
    async fn connect_memory() -> Result<SqlitePool, DbError> {
        let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
        let options = SqliteConnectOptions::new()
            .filename(format!(
                "file:gatekeeper-memdb-{}-{id}?mode=memory&cache=shared",
                std::process::id()
            ))
            .shared_cache(true)
            .create_if_missing(true);

        Ok(SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Self::ACQUIRE_TIMEOUT)
            .idle_timeout(None)
            .connect_with(options)
            .await?)
    }

    async fn connect_file(path: &str) -> Result<SqlitePool, DbError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            tracing::warn!(path = %parent.display(), error = %e, "Failed to create database directory");
        }

        // Graph reads and revocation checks run while a password rotation or
        // revocation write is in flight.
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        Ok(SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Self::ACQUIRE_TIMEOUT)
            .idle_timeout(Some(Self::IDLE_TIMEOUT))
            .connect_with(options)
            .await?)
    }

    async fn check_integrity(pool: &SqlitePool) -> Result<(), DbError> {
        let result: String = sqlx::query_scalar("PRAGMA integrity_check")
            .fetch_one(pool)
            .await?;
        if result != "ok" {
            tracing::error!(integrity_check = %result, "Database integrity check failed");
            return Err(DbError::Integrity(result));
        }
        Ok(())
    }

    /// Get reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations checked/applied");
        Ok(())
    }

    /// Get menu/role graph repository.
    pub fn graph(&self) -> MenuRepository<'_> {
        MenuRepository::new(&self.pool)
    }

    /// Get user account repository.
    pub fn accounts(&self) -> UserRepository<'_> {
        UserRepository::new(&self.pool)
    }
}

/// `?, ?, ?` for an `IN (...)` list of `n` values.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[async_trait]
impl GraphReader for Database {
    async fn menus(&self, filter: MenuFilter) -> Result<Vec<Menu>, GraphError> {
        Ok(self.graph().all(filter).await?)
    }

    async fn menus_by_ids(
        &self,
        ids: &[MenuId],
        filter: MenuFilter,
    ) -> Result<Vec<Menu>, GraphError> {
        Ok(self.graph().by_ids(ids, filter).await?)
    }

    async fn menu_actions(&self) -> Result<Vec<MenuAction>, GraphError> {
        Ok(self.graph().actions().await?)
    }

    async fn menu_actions_by_ids(&self, ids: &[ActionId]) -> Result<Vec<MenuAction>, GraphError> {
        Ok(self.graph().actions_by_ids(ids).await?)
    }

    async fn role_menus(&self, role_ids: &[RoleId]) -> Result<Vec<RoleMenuBinding>, GraphError> {
        Ok(self.graph().role_bindings(role_ids).await?)
    }

    async fn user_roles(&self, user_id: &str) -> Result<Vec<UserRoleBinding>, GraphError> {
        Ok(self.accounts().roles_of(user_id).await?)
    }

    async fn roles_by_ids(
        &self,
        ids: &[RoleId],
        enabled_only: bool,
    ) -> Result<Vec<Role>, GraphError> {
        Ok(self.accounts().roles_by_ids(ids, enabled_only).await?)
    }
}

#[async_trait]
impl UserStore for Database {
    async fn find_by_name(&self, user_name: &str) -> Result<Vec<UserRecord>, GraphError> {
        Ok(self.accounts().find_by_name(user_name).await?)
    }

    async fn get(&self, user_id: &str) -> Result<Option<UserRecord>, GraphError> {
        Ok(self.accounts().get(user_id).await?)
    }

    async fn update_password(&self, user_id: &str, digest: &str) -> Result<(), GraphError> {
        if self.accounts().update_password(user_id, digest).await? {
            Ok(())
        } else {
            Err(GraphError::NotFound(format!("user {user_id}")))
        }
    }
}

impl From<DbError> for GraphError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Sqlx(e) => GraphError::from(e),
            other => GraphError::Database(other.to_string()),
        }
    }
}
