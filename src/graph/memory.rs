//! In-memory graph snapshot.
//!
//! Implements both [`GraphReader`] and [`UserStore`] over plain vectors
//! behind a [`parking_lot::RwLock`]. Builder methods make fixtures terse.

use super::{
    ActionId, GraphError, GraphReader, Menu, MenuAction, MenuFilter, MenuId, Role, RoleId,
    RoleMenuBinding, Status, UserRecord, UserRoleBinding, UserStore,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;

#[derive(Debug, Default)]
struct Snapshot {
    menus: Vec<Menu>,
    actions: Vec<MenuAction>,
    roles: Vec<Role>,
    role_menus: Vec<RoleMenuBinding>,
    user_roles: Vec<UserRoleBinding>,
    users: Vec<UserRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryGraph {
    inner: RwLock<Snapshot>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_menu(self, id: &str, parent_id: &str, sequence: i64, status: Status) -> Self {
        self.inner.write().menus.push(Menu {
            id: id.to_string(),
            name: id.to_string(),
            parent_id: parent_id.to_string(),
            sequence,
            status,
        });
        self
    }

    pub fn with_action(self, id: &str, menu_id: &str) -> Self {
        self.inner.write().actions.push(MenuAction {
            id: id.to_string(),
            menu_id: menu_id.to_string(),
            code: id.to_string(),
            name: id.to_string(),
        });
        self
    }

    pub fn with_role(self, id: &str, status: Status) -> Self {
        self.inner.write().roles.push(Role {
            id: id.to_string(),
            name: id.to_string(),
            status,
        });
        self
    }

    /// Bind `menu_id` to `role_id` granting `action_ids`.
    pub fn with_role_menu(self, role_id: &str, menu_id: &str, action_ids: &[&str]) -> Self {
        self.inner.write().role_menus.push(RoleMenuBinding {
            role_id: role_id.to_string(),
            menu_id: menu_id.to_string(),
            action_ids: action_ids.iter().map(|a| a.to_string()).collect(),
        });
        self
    }

    pub fn with_user_role(self, user_id: &str, role_id: &str) -> Self {
        self.inner.write().user_roles.push(UserRoleBinding {
            user_id: user_id.to_string(),
            role_id: role_id.to_string(),
        });
        self
    }

    pub fn with_user(self, user: UserRecord) -> Self {
        self.inner.write().users.push(user);
        self
    }
}

fn id_set(ids: &[String]) -> HashSet<&str> {
    ids.iter().map(String::as_str).collect()
}

#[async_trait]
impl GraphReader for MemoryGraph {
    async fn menus(&self, filter: MenuFilter) -> Result<Vec<Menu>, GraphError> {
        Ok(self
            .inner
            .read()
            .menus
            .iter()
            .filter(|m| filter.admits(m.status))
            .cloned()
            .collect())
    }

    async fn menus_by_ids(
        &self,
        ids: &[MenuId],
        filter: MenuFilter,
    ) -> Result<Vec<Menu>, GraphError> {
        let wanted = id_set(ids);
        Ok(self
            .inner
            .read()
            .menus
            .iter()
            .filter(|m| wanted.contains(m.id.as_str()) && filter.admits(m.status))
            .cloned()
            .collect())
    }

    async fn menu_actions(&self) -> Result<Vec<MenuAction>, GraphError> {
        Ok(self.inner.read().actions.clone())
    }

    async fn menu_actions_by_ids(&self, ids: &[ActionId]) -> Result<Vec<MenuAction>, GraphError> {
        let wanted = id_set(ids);
        Ok(self
            .inner
            .read()
            .actions
            .iter()
            .filter(|a| wanted.contains(a.id.as_str()))
            .cloned()
            .collect())
    }

    async fn role_menus(&self, role_ids: &[RoleId]) -> Result<Vec<RoleMenuBinding>, GraphError> {
        let wanted = id_set(role_ids);
        Ok(self
            .inner
            .read()
            .role_menus
            .iter()
            .filter(|b| wanted.contains(b.role_id.as_str()))
            .cloned()
            .collect())
    }

    async fn user_roles(&self, user_id: &str) -> Result<Vec<UserRoleBinding>, GraphError> {
        Ok(self
            .inner
            .read()
            .user_roles
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn roles_by_ids(
        &self,
        ids: &[RoleId],
        enabled_only: bool,
    ) -> Result<Vec<Role>, GraphError> {
        let wanted = id_set(ids);
        Ok(self
            .inner
            .read()
            .roles
            .iter()
            .filter(|r| wanted.contains(r.id.as_str()))
            .filter(|r| !enabled_only || r.status.is_enabled())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryGraph {
    async fn find_by_name(&self, user_name: &str) -> Result<Vec<UserRecord>, GraphError> {
        Ok(self
            .inner
            .read()
            .users
            .iter()
            .filter(|u| u.user_name == user_name)
            .cloned()
            .collect())
    }

    async fn get(&self, user_id: &str) -> Result<Option<UserRecord>, GraphError> {
        Ok(self.inner.read().users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn update_password(&self, user_id: &str, digest: &str) -> Result<(), GraphError> {
        let mut inner = self.inner.write();
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| GraphError::NotFound(format!("user {user_id}")))?;
        user.password = digest.to_string();
        Ok(())
    }
}
