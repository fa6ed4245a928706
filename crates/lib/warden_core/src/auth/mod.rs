//! Authentication and authorization logic.
//!
//! Token signing and verification, password checks, and the
//! [`Authenticator`] that exposes each request-pipeline stage as a method.

pub mod authenticator;
pub mod authorize;
pub mod context;
pub mod jwt;
pub mod password;
pub mod revocation;

pub use authenticator::{Authenticator, IssuedToken, bearer_token};
pub use context::AuthContext;
pub use jwt::TokenCodec;

use thiserror::Error;

use crate::store::StoreError;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Session revoked")]
    SessionRevoked,

    #[error("Invalid session")]
    InvalidSession,

    #[error("Invalid credentials")]
    CredentialError,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
