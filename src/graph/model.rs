//! Menu, role and user records read from the graph store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type MenuId = String;
pub type ActionId = String;
pub type RoleId = String;

/// Enabled/disabled flag shared by menus and roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Enabled,
    Disabled,
}

impl Status {
    /// Stored integer form (1 = enabled, 2 = disabled).
    pub fn as_i64(self) -> i64 {
        match self {
            Status::Enabled => 1,
            Status::Disabled => 2,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        if value == 1 {
            Status::Enabled
        } else {
            Status::Disabled
        }
    }

    pub fn is_enabled(self) -> bool {
        self == Status::Enabled
    }
}

/// A node in the menu forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    pub id: MenuId,
    pub name: String,
    /// Empty for roots.
    pub parent_id: MenuId,
    /// Display order; larger sorts first among siblings.
    pub sequence: i64,
    pub status: Status,
}

impl Menu {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_empty()
    }
}

/// An invocable action owned by a menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuAction {
    pub id: ActionId,
    pub menu_id: MenuId,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub status: Status,
}

/// A role exposing a menu together with the actions it grants on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMenuBinding {
    pub role_id: RoleId,
    pub menu_id: MenuId,
    pub action_ids: BTreeSet<ActionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRoleBinding {
    pub user_id: String,
    pub role_id: RoleId,
}

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub user_name: String,
    pub real_name: String,
    /// Credential digest, see [`crate::identity::credential_digest`].
    pub password: String,
    pub status: Status,
}

/// Which menus a menu query should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuFilter {
    /// Only enabled menus.
    Enabled,
    /// Any status.
    Any,
}

impl MenuFilter {
    pub fn admits(self, status: Status) -> bool {
        match self {
            MenuFilter::Enabled => status.is_enabled(),
            MenuFilter::Any => true,
        }
    }
}
