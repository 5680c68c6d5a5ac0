//! Menu, menu action and role-menu reads.

use super::{DbError, placeholders};
use crate::graph::{
    ActionId, Menu, MenuAction, MenuFilter, MenuId, RoleId, RoleMenuBinding, Status,
};
use sqlx::SqlitePool;
use std::collections::{BTreeMap, BTreeSet};

type MenuRow = (String, String, String, i64, i64);
type ActionRow = (String, String, String, String);

fn menu_from_row((id, name, parent_id, sequence, status): MenuRow) -> Menu {
    Menu {
        id,
        name,
        parent_id,
        sequence,
        status: Status::from_i64(status),
    }
}

fn action_from_row((id, menu_id, code, name): ActionRow) -> MenuAction {
    MenuAction {
        id,
        menu_id,
        code,
        name,
    }
}

fn status_clause(filter: MenuFilter) -> &'static str {
    match filter {
        MenuFilter::Enabled => " AND status = 1",
        MenuFilter::Any => "",
    }
}

/// Repository for menu graph reads.
pub struct MenuRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MenuRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn all(&self, filter: MenuFilter) -> Result<Vec<Menu>, DbError> {
        let query = format!(
            "SELECT id, name, parent_id, sequence, status FROM menus WHERE 1 = 1{} ORDER BY sequence DESC, id",
            status_clause(filter)
        );
        let rows = sqlx::query_as::<_, MenuRow>(&query)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(menu_from_row).collect())
    }

    pub async fn by_ids(&self, ids: &[MenuId], filter: MenuFilter) -> Result<Vec<Menu>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT id, name, parent_id, sequence, status FROM menus WHERE id IN ({}){} ORDER BY sequence DESC, id",
            placeholders(ids.len()),
            status_clause(filter)
        );
        let mut q = sqlx::query_as::<_, MenuRow>(&query);
        for id in ids {
            q = q.bind(id);
        }
        let rows = q.fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(menu_from_row).collect())
    }

    pub async fn actions(&self) -> Result<Vec<MenuAction>, DbError> {
        let rows = sqlx::query_as::<_, ActionRow>(
            "SELECT id, menu_id, code, name FROM menu_actions ORDER BY menu_id, id",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(action_from_row).collect())
    }

    pub async fn actions_by_ids(&self, ids: &[ActionId]) -> Result<Vec<MenuAction>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT id, menu_id, code, name FROM menu_actions WHERE id IN ({}) ORDER BY menu_id, id",
            placeholders(ids.len())
        );
        let mut q = sqlx::query_as::<_, ActionRow>(&query);
        for id in ids {
            q = q.bind(id);
        }
        let rows = q.fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(action_from_row).collect())
    }

    /// Bindings for `role_ids`, one per (role, menu) pair.
    ///
    /// A `role_menus` row with a NULL `action_id` binds the menu without
    /// granting an action.
    pub async fn role_bindings(&self, role_ids: &[RoleId]) -> Result<Vec<RoleMenuBinding>, DbError> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT role_id, menu_id, action_id FROM role_menus WHERE role_id IN ({})",
            placeholders(role_ids.len())
        );
        let mut q = sqlx::query_as::<_, (String, String, Option<String>)>(&query);
        for id in role_ids {
            q = q.bind(id);
        }
        let rows = q.fetch_all(self.pool).await?;

        let mut grouped: BTreeMap<(RoleId, MenuId), BTreeSet<ActionId>> = BTreeMap::new();
        for (role_id, menu_id, action_id) in rows {
            let actions = grouped.entry((role_id, menu_id)).or_default();
            if let Some(action_id) = action_id {
                actions.insert(action_id);
            }
        }

        Ok(grouped
            .into_iter()
            .map(|((role_id, menu_id), action_ids)| RoleMenuBinding {
                role_id,
                menu_id,
                action_ids,
            })
            .collect())
    }
}
