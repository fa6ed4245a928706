//! Role and permission checks layered after authentication.
//!
//! The role check and the in-context permission check only read the
//! [`AuthContext`]. The durable permission check reloads the user's role
//! from the store on every call, so it reflects role edits immediately at
//! the cost of one read per request.

use tracing::{debug, warn};

use super::{AuthContext, AuthError, Authenticator};

impl Authenticator {
    /// Require the token's role to equal `required`.
    pub fn authorize_role(&self, ctx: &AuthContext, required: &str) -> Result<(), AuthError> {
        if ctx.has_role(required) {
            return Ok(());
        }
        debug!(user_id = %ctx.user_id, required, "role check rejected");
        Err(AuthError::Forbidden("Access denied".into()))
    }

    /// Require `slug` among the permission slugs carried by the token.
    ///
    /// An empty permission set is simply "no permissions".
    pub fn authorize_permission(&self, ctx: &AuthContext, slug: &str) -> Result<(), AuthError> {
        if ctx.has_permission(slug) {
            return Ok(());
        }
        debug!(user_id = %ctx.user_id, slug, "permission check rejected");
        Err(AuthError::Forbidden("Missing required permission".into()))
    }

    /// Require `slug` among the permissions of the user's current role, as
    /// loaded from the store. Token-carried permissions are ignored.
    pub async fn authorize_permission_durable(
        &self,
        ctx: &AuthContext,
        slug: &str,
    ) -> Result<(), AuthError> {
        let user = match self.bounded(self.store.find_by_id(ctx.user_id)).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!(user_id = %ctx.user_id, "permission check: user not found");
                return Err(AuthError::Forbidden("User role not found".into()));
            }
            Err(e) => {
                warn!(user_id = %ctx.user_id, error = %e, "permission check: store read failed");
                return Err(AuthError::Forbidden("User role not found".into()));
            }
        };

        if user.role.has_permission(slug) {
            return Ok(());
        }
        debug!(user_id = %ctx.user_id, slug, role = %user.role.name, "durable permission check rejected");
        Err(AuthError::Forbidden("Missing required permission".into()))
    }
}
