//! Durable user storage.
//!
//! [`UserStore`] is the slow, authoritative tier consulted by the durable
//! permission check, the revocation stage on cache miss, and login.

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::User;

/// Errors from the durable user store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Not found")]
    NotFound,

    #[error("Store read timed out after {0:?}")]
    Timeout(Duration),
}

/// Read access to users (with role and permissions) plus the one write the
/// auth core owns: role change with security-version rotation.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Load a user with its role and the role's permissions.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Load a user by unique username, with role and permissions.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Current security-version stamp only.
    async fn security_version(&self, id: Uuid) -> Result<Option<Uuid>, StoreError>;

    /// Atomically set the user's role and security version.
    ///
    /// Returns [`StoreError::NotFound`] if the user or role does not exist.
    async fn update_role_and_version(
        &self,
        id: Uuid,
        role_id: i64,
        version: Uuid,
    ) -> Result<(), StoreError>;
}
