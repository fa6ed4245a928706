//! Admin-only handlers.

use axum::Json;
use axum::extract::{Path, State};
use tracing::{info, warn};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{
    StatsResponse, UpdateRoleRequest, UpdateRoleResponse, UpstreamStatusResponse,
};

/// `GET /admin/stats`: demo payload.
pub async fn stats_handler() -> Json<StatsResponse> {
    Json(StatsResponse {
        status: "Welcome Admin".into(),
        active_users: 42,
    })
}

/// `PATCH /admin/users/{id}/role`: move a user to another role, revoking
/// their existing tokens.
pub async fn update_role_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UpdateRoleRequest>,
) -> AppResult<Json<UpdateRoleResponse>> {
    state.auth.update_user_role(user_id, body.role_id).await?;
    info!(%user_id, role_id = body.role_id, "user role changed by admin");
    Ok(Json(UpdateRoleResponse {
        user_id,
        role_id: body.role_id,
    }))
}

/// `GET /admin/upstream`: whether an upstream access token can be obtained.
pub async fn upstream_status_handler(State(state): State<AppState>) -> Json<UpstreamStatusResponse> {
    let Some(client) = state.upstream.as_ref() else {
        return Json(UpstreamStatusResponse {
            configured: false,
            connected: false,
        });
    };
    let connected = match client.credentials().bearer_token().await {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "upstream credential check failed");
            false
        }
    };
    Json(UpstreamStatusResponse {
        configured: true,
        connected,
    })
}
