//! Request-scoped identity produced by the authentication stage.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::models::auth::TokenClaims;

/// Identity attached to a request once its bearer token has been verified.
///
/// Downstream stages read this instead of re-decoding the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: String,
    pub permissions: BTreeSet<String>,
    pub security_version: Uuid,
    /// Token expiry (unix timestamp).
    pub expires_at: i64,
}

impl AuthContext {
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    /// Checks the permission slugs carried by the token.
    pub fn has_permission(&self, slug: &str) -> bool {
        self.permissions.contains(slug)
    }
}

impl From<TokenClaims> for AuthContext {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
            permissions: claims.permissions,
            security_version: claims.ver,
            expires_at: claims.exp,
        }
    }
}
