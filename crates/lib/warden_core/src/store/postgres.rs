//! PostgreSQL-backed [`UserStore`].
//!
//! Expects `users(id uuid, username, email, password_hash, role_id,
//! security_version uuid)`, `roles(id, name)`, `permissions(id, name, slug)`
//! and the `role_permissions(role_id, permission_id)` join table.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{StoreError, UserStore};
use crate::models::auth::{Permission, Role, User};

/// One row per granted permission; permission columns are NULL for a role
/// with no permissions.
type UserRow = (
    Uuid,
    String,
    String,
    String,
    Uuid,
    i64,
    String,
    Option<i64>,
    Option<String>,
    Option<String>,
);

const USER_WITH_PERMISSIONS: &str = "\
    SELECT u.id, u.username, u.email, u.password_hash, u.security_version, \
           r.id, r.name, p.id, p.name, p.slug \
    FROM users u \
    JOIN roles r ON r.id = u.role_id \
    LEFT JOIN role_permissions rp ON rp.role_id = r.id \
    LEFT JOIN permissions p ON p.id = rp.permission_id";

/// Fold joined rows into a single user.
fn user_from_rows(rows: Vec<UserRow>) -> Option<User> {
    let mut rows = rows.into_iter();
    let (id, username, email, password_hash, security_version, role_id, role_name, p_id, p_name, p_slug) =
        rows.next()?;

    let mut permissions = Vec::new();
    let mut push = |id: Option<i64>, name: Option<String>, slug: Option<String>| {
        if let (Some(id), Some(name), Some(slug)) = (id, name, slug) {
            permissions.push(Permission { id, name, slug });
        }
    };
    push(p_id, p_name, p_slug);
    for (.., p_id, p_name, p_slug) in rows {
        push(p_id, p_name, p_slug);
    }

    Some(User {
        id,
        username,
        email,
        password_hash,
        security_version,
        role: Role {
            id: role_id,
            name: role_name,
            permissions,
        },
    })
}

/// [`UserStore`] over a shared connection pool.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!("{USER_WITH_PERMISSIONS} WHERE u.id = $1"))
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        Ok(user_from_rows(rows))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "{USER_WITH_PERMISSIONS} WHERE u.username = $1"
        ))
        .bind(username)
        .fetch_all(&self.pool)
        .await?;
        Ok(user_from_rows(rows))
    }

    async fn security_version(&self, id: Uuid) -> Result<Option<Uuid>, StoreError> {
        let version =
            sqlx::query_scalar::<_, Uuid>("SELECT security_version FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(version)
    }

    async fn update_role_and_version(
        &self,
        id: Uuid,
        role_id: i64,
        version: Uuid,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let role_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM roles WHERE id = $1)")
                .bind(role_id)
                .fetch_one(&mut *tx)
                .await?;
        if !role_exists {
            return Err(StoreError::NotFound);
        }

        let result =
            sqlx::query("UPDATE users SET role_id = $2, security_version = $3 WHERE id = $1")
                .bind(id)
                .bind(role_id)
                .bind(version)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }
}
