//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! shapes in `warden_api` (which use camelCase on the wire).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single grantable capability. `slug` is what authorization compares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Named role with its (unordered) permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub permissions: Vec<Permission>,
}

impl Role {
    /// Whether any of this role's permissions carries `slug`.
    pub fn has_permission(&self, slug: &str) -> bool {
        self.permissions.iter().any(|p| p.slug == slug)
    }

    /// Distinct permission slugs, as embedded into access tokens.
    pub fn permission_slugs(&self) -> BTreeSet<String> {
        self.permissions.iter().map(|p| p.slug.clone()).collect()
    }
}

/// Durable user record, loaded together with its role and permissions.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    /// Rotated whenever the user's authorization state changes.
    pub security_version: Uuid,
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: user ID (standard JWT `sub` claim).
    pub sub: Uuid,
    /// Role name at issue time.
    pub role: String,
    /// Permission slugs granted by the role at issue time.
    #[serde(default)]
    pub permissions: BTreeSet<String>,
    /// Security-version stamp at issue time.
    pub ver: Uuid,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}
