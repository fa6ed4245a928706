//! Current identity.

use axum::{Extension, Json};

use crate::middleware::auth::AuthenticatedUser;
use crate::models::MeResponse;

/// `GET /api/me`: echo the verified request context.
pub async fn me_handler(Extension(user): Extension<AuthenticatedUser>) -> Json<MeResponse> {
    let ctx = user.0;
    Json(MeResponse {
        user_id: ctx.user_id,
        role: ctx.role,
        permissions: ctx.permissions,
        expires_at: ctx.expires_at,
    })
}
