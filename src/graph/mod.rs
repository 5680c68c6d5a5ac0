//! Read access to the menu/role/action graph and to stored users.
//!
//! Every read is a point-in-time snapshot; nothing in the core mutates the
//! graph. Backends:
//!
//! - [`memory::MemoryGraph`] holds a snapshot in process.
//! - [`crate::db::Database`] reads the SQLite tables.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub mod memory;
pub mod model;

pub use memory::MemoryGraph;
pub use model::{
    ActionId, Menu, MenuAction, MenuFilter, MenuId, Role, RoleId, RoleMenuBinding, Status,
    UserRecord, UserRoleBinding,
};

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("graph read timed out after {0:?}")]
    Timeout(Duration),
}

impl From<sqlx::Error> for GraphError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => GraphError::NotFound("row".to_string()),
            other => GraphError::Database(other.to_string()),
        }
    }
}

/// Graph-read capability consumed by the permission resolver.
#[async_trait]
pub trait GraphReader: Send + Sync {
    /// All menus admitted by `filter`.
    async fn menus(&self, filter: MenuFilter) -> Result<Vec<Menu>, GraphError>;

    /// Menus whose id is in `ids` and admitted by `filter`. Unknown ids are skipped.
    async fn menus_by_ids(&self, ids: &[MenuId], filter: MenuFilter)
    -> Result<Vec<Menu>, GraphError>;

    /// Every menu action.
    async fn menu_actions(&self) -> Result<Vec<MenuAction>, GraphError>;

    /// Menu actions whose id is in `ids`.
    async fn menu_actions_by_ids(&self, ids: &[ActionId]) -> Result<Vec<MenuAction>, GraphError>;

    /// Role-menu bindings for any role in `role_ids`.
    async fn role_menus(&self, role_ids: &[RoleId]) -> Result<Vec<RoleMenuBinding>, GraphError>;

    async fn user_roles(&self, user_id: &str) -> Result<Vec<UserRoleBinding>, GraphError>;

    /// Roles whose id is in `ids`; `enabled_only` drops disabled roles.
    async fn roles_by_ids(&self, ids: &[RoleId], enabled_only: bool)
    -> Result<Vec<Role>, GraphError>;
}

/// Stored user accounts, used by the database credential strategy and by
/// credential rotation.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Every user whose login name equals `user_name`.
    async fn find_by_name(&self, user_name: &str) -> Result<Vec<UserRecord>, GraphError>;

    async fn get(&self, user_id: &str) -> Result<Option<UserRecord>, GraphError>;

    /// Replace the stored credential digest.
    async fn update_password(&self, user_id: &str, digest: &str) -> Result<(), GraphError>;
}

/// Run a graph read under `limit`, mapping an elapsed deadline to [`GraphError::Timeout`].
pub(crate) async fn with_deadline<T>(
    limit: Duration,
    fut: impl std::future::Future<Output = Result<T, GraphError>>,
) -> Result<T, GraphError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| GraphError::Timeout(limit))?
}
