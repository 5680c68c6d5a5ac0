//! User account, user-role and role reads.

use super::{DbError, placeholders};
use crate::graph::{Role, RoleId, Status, UserRecord, UserRoleBinding};
use sqlx::SqlitePool;

type UserRow = (String, String, String, String, i64);

fn user_from_row((id, user_name, real_name, password, status): UserRow) -> UserRecord {
    UserRecord {
        id,
        user_name,
        real_name,
        password,
        status: Status::from_i64(status),
    }
}

/// Repository for user accounts.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Every account with this login name. More than one is a data error the
    /// caller must reject.
    pub async fn find_by_name(&self, user_name: &str) -> Result<Vec<UserRecord>, DbError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, user_name, real_name, password, status
            FROM users
            WHERE user_name = ?
            "#,
        )
        .bind(user_name)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(user_from_row).collect())
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<UserRecord>, DbError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, user_name, real_name, password, status
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(user_from_row))
    }

    /// Replace the credential digest. Returns false if no such user.
    pub async fn update_password(&self, user_id: &str, digest: &str) -> Result<bool, DbError> {
        let result = sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(digest)
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn roles_of(&self, user_id: &str) -> Result<Vec<UserRoleBinding>, DbError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT user_id, role_id FROM user_roles WHERE user_id = ? ORDER BY role_id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(user_id, role_id)| UserRoleBinding { user_id, role_id })
            .collect())
    }

    pub async fn roles_by_ids(&self, ids: &[RoleId], enabled_only: bool) -> Result<Vec<Role>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT id, name, status FROM roles WHERE id IN ({}){} ORDER BY sequence DESC, id",
            placeholders(ids.len()),
            if enabled_only { " AND status = 1" } else { "" }
        );
        let mut q = sqlx::query_as::<_, (String, String, i64)>(&query);
        for id in ids {
            q = q.bind(id);
        }
        let rows = q.fetch_all(self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(id, name, status)| Role {
                id,
                name,
                status: Status::from_i64(status),
            })
            .collect())
    }
}
