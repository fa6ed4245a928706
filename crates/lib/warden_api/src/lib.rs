//! # warden_api
//!
//! HTTP API library for Warden: the request pipeline
//! (authentication → role/permission → revocation) as axum middleware,
//! plus the handlers that exercise it.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch, post};
use tower_http::trace::TraceLayer;
use warden_core::auth::Authenticator;
use warden_core::upstream::AuthorizedClient;

use crate::handlers::{admin, auth, health, me, reports};
use crate::middleware::auth::{
    PermissionGate, RequiredPermission, RequiredRole, require_auth, require_permission,
    require_permission_durable, require_role, require_session,
};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Token codec plus store and cache handles.
    pub auth: Arc<Authenticator>,
    /// Outbound client for the upstream service, when configured.
    pub upstream: Option<AuthorizedClient>,
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public = Router::new()
        .route("/health", get(health::health_handler))
        .route("/auth/login", post(auth::login_handler));

    // Token + live session
    let session = Router::new()
        .route("/api/me", get(me::me_handler))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    // Token + permission re-read from the store
    let reports = Router::new()
        .route("/api/reports", get(reports::reports_handler))
        .route_layer(from_fn_with_state(
            PermissionGate::new(state.auth.clone(), reports::REPORTS_PERMISSION),
            require_permission_durable,
        ));

    // Token-carried permission, trusted because the session is re-validated
    let summary = Router::new()
        .route("/api/reports/summary", get(reports::summary_handler))
        .route_layer(from_fn_with_state(state.clone(), require_session))
        .route_layer(from_fn_with_state(
            RequiredPermission::new(state.auth.clone(), reports::REPORTS_PERMISSION),
            require_permission,
        ));

    // Token + admin role + live session
    let admin = Router::new()
        .route("/admin/stats", get(admin::stats_handler))
        .route("/admin/users/{id}/role", patch(admin::update_role_handler))
        .route("/admin/upstream", get(admin::upstream_status_handler))
        .route_layer(from_fn_with_state(state.clone(), require_session))
        .route_layer(from_fn_with_state(
            RequiredRole::new(state.auth.clone(), "admin"),
            require_role,
        ));

    let protected = Router::new()
        .merge(session)
        .merge(reports)
        .merge(summary)
        .merge(admin)
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
