//! Authentication and authorization middleware.
//!
//! Thin axum adapters over [`Authenticator`]: each one reads its inputs from
//! the request, calls the matching stage, and either continues the chain or
//! short-circuits with the mapped [`AppError`]. Stage order is
//! `require_auth` → role/permission → `require_session`.

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use warden_core::auth::{AuthContext, Authenticator};

use crate::AppState;
use crate::error::AppError;

/// Verified identity, stored in request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub AuthContext);

/// Required role for [`require_role`].
#[derive(Clone)]
pub struct RequiredRole {
    pub auth: Arc<Authenticator>,
    pub role: Arc<str>,
}

impl RequiredRole {
    pub fn new(auth: Arc<Authenticator>, role: &str) -> Self {
        Self {
            auth,
            role: Arc::from(role),
        }
    }
}

/// Required permission slug for [`require_permission`].
#[derive(Clone)]
pub struct RequiredPermission {
    pub auth: Arc<Authenticator>,
    pub slug: Arc<str>,
}

impl RequiredPermission {
    pub fn new(auth: Arc<Authenticator>, slug: &str) -> Self {
        Self {
            auth,
            slug: Arc::from(slug),
        }
    }
}

/// Required permission slug plus store access for
/// [`require_permission_durable`].
#[derive(Clone)]
pub struct PermissionGate {
    pub auth: Arc<Authenticator>,
    pub slug: Arc<str>,
}

impl PermissionGate {
    pub fn new(auth: Arc<Authenticator>, slug: &str) -> Self {
        Self {
            auth,
            slug: Arc::from(slug),
        }
    }
}

/// Context placed by [`require_auth`]. Missing means the stage was not
/// layered, which is treated as unauthenticated.
fn context(request: &Request) -> Result<&AuthContext, AppError> {
    request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|user| &user.0)
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".into()))
}

/// Extracts `Authorization: Bearer <token>`, verifies the JWT, and injects
/// [`AuthenticatedUser`] into request extensions. No store or cache access.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let ctx = state.auth.authenticate(header)?;
    request.extensions_mut().insert(AuthenticatedUser(ctx));
    Ok(next.run(request).await)
}

/// Rejects with 403 unless the token's role equals the required role.
pub async fn require_role(
    State(required): State<RequiredRole>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = context(&request)?;
    required.auth.authorize_role(ctx, &required.role)?;
    Ok(next.run(request).await)
}

/// Rejects with 403 unless the token carries the required permission slug.
pub async fn require_permission(
    State(required): State<RequiredPermission>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = context(&request)?;
    required.auth.authorize_permission(ctx, &required.slug)?;
    Ok(next.run(request).await)
}

/// Rejects with 403 unless the user's current role (read from the store)
/// grants the required permission slug.
pub async fn require_permission_durable(
    State(gate): State<PermissionGate>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = context(&request)?;
    gate.auth
        .authorize_permission_durable(ctx, &gate.slug)
        .await?;
    Ok(next.run(request).await)
}

/// Rejects with 401 if the token's security version is no longer current.
pub async fn require_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = context(&request)?;
    state.auth.validate_session(ctx).await?;
    Ok(next.run(request).await)
}
