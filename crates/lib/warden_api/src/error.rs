//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;
use warden_core::auth::AuthError;
use warden_core::store::StoreError;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::Internal(detail) => {
                error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidToken | AuthError::ExpiredToken => {
                AppError::Unauthorized("Unauthorized".into())
            }
            AuthError::SessionRevoked => {
                AppError::Unauthorized("Session revoked. Please log in again.".into())
            }
            AuthError::InvalidSession => AppError::Unauthorized("Invalid session".into()),
            AuthError::CredentialError => AppError::Unauthorized("Invalid credentials".into()),
            AuthError::Forbidden(msg) => AppError::Forbidden(msg),
            AuthError::Store(StoreError::NotFound) => AppError::NotFound("User or role".into()),
            AuthError::Store(e) => AppError::Internal(e.to_string()),
            AuthError::Signing(msg) | AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(e: AuthError) -> StatusCode {
        AppError::from(e).into_response().status()
    }

    #[test]
    fn authentication_failures_are_401() {
        assert_eq!(status_of(AuthError::InvalidToken), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::ExpiredToken), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::SessionRevoked), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::InvalidSession), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::CredentialError), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn authorization_failures_are_403() {
        assert_eq!(
            status_of(AuthError::Forbidden("Access denied".into())),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let resp = AppError::from(AuthError::Signing("key material broken".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err = AppError::Internal("db password wrong".into());
        assert_eq!(err.to_string(), "Internal server error");
    }
}
