//! In-process [`UserStore`], used for local development and tests.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::{StoreError, UserStore};
use crate::models::auth::{Role, User};

/// Users and roles held in concurrent maps. A user's role is resolved at
/// read time, so editing a role is visible to every member immediately.
#[derive(Default)]
pub struct MemoryUserStore {
    roles: DashMap<i64, Role>,
    users: DashMap<Uuid, StoredUser>,
}

struct StoredUser {
    username: String,
    email: String,
    password_hash: String,
    role_id: i64,
    security_version: Uuid,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a role.
    pub fn insert_role(&self, role: Role) {
        self.roles.insert(role.id, role);
    }

    /// Create a user with a fresh ID and security version.
    pub fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role_id: i64,
    ) -> Result<Uuid, StoreError> {
        if !self.roles.contains_key(&role_id) {
            return Err(StoreError::NotFound);
        }
        let id = Uuid::new_v4();
        self.users.insert(
            id,
            StoredUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                role_id,
                security_version: Uuid::new_v4(),
            },
        );
        Ok(id)
    }

    /// Synchronous lookup, resolving the role.
    pub fn user(&self, id: Uuid) -> Option<User> {
        let stored = self.users.get(&id)?;
        let role = self.roles.get(&stored.role_id)?.clone();
        Some(User {
            id,
            username: stored.username.clone(),
            email: stored.email.clone(),
            password_hash: stored.password_hash.clone(),
            role,
            security_version: stored.security_version,
        })
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.user(id))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let id = self
            .users
            .iter()
            .find(|entry| entry.username == username)
            .map(|entry| *entry.key());
        Ok(id.and_then(|id| self.user(id)))
    }

    async fn security_version(&self, id: Uuid) -> Result<Option<Uuid>, StoreError> {
        Ok(self.users.get(&id).map(|u| u.security_version))
    }

    async fn update_role_and_version(
        &self,
        id: Uuid,
        role_id: i64,
        version: Uuid,
    ) -> Result<(), StoreError> {
        if !self.roles.contains_key(&role_id) {
            return Err(StoreError::NotFound);
        }
        let mut user = self.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.role_id = role_id;
        user.security_version = version;
        Ok(())
    }
}
