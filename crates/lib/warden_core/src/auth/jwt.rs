//! JWT token generation and verification.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{info, warn};
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::TokenClaims;

/// Access token lifetime: 24 hours.
pub const ACCESS_TOKEN_EXPIRY_SECS: i64 = 24 * 60 * 60;

/// HS256 signer/verifier bound to one process-wide secret.
///
/// Built once at startup; rotating the secret means building a new codec,
/// which invalidates every token issued by the old one.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    expiry_secs: i64,
}

impl TokenCodec {
    /// Create a codec for `secret`. Fails if the secret is empty.
    pub fn new(secret: &[u8]) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Signing("signing secret is empty".into()));
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            expiry_secs: ACCESS_TOKEN_EXPIRY_SECS,
        })
    }

    /// Token lifetime in seconds.
    pub fn expiry_secs(&self) -> i64 {
        self.expiry_secs
    }

    /// Issue a signed access token (issued now, expiring after 24 hours).
    pub fn issue(
        &self,
        user_id: Uuid,
        role: &str,
        permissions: BTreeSet<String>,
        security_version: Uuid,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user_id,
            role: role.to_string(),
            permissions,
            ver: security_version,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.expiry_secs)).timestamp(),
        };
        self.sign(&claims)
    }

    /// Sign an explicit claim set.
    pub fn sign(&self, claims: &TokenClaims) -> Result<String, AuthError> {
        if claims.exp <= claims.iat {
            return Err(AuthError::Signing("expiry must be after issued-at".into()));
        }
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Signing(format!("jwt encode: {e}")))
    }

    /// Verify signature and expiry, returning the claims on success.
    ///
    /// A token past its expiry reports [`AuthError::ExpiredToken`] even when
    /// its signature does not verify; everything else that fails is
    /// [`AuthError::InvalidToken`].
    pub fn decode(&self, token: &str) -> Result<TokenClaims, AuthError> {
        match decode::<TokenClaims>(token, &self.decoding, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(AuthError::ExpiredToken),
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm
                    if self.is_expired_unverified(token) =>
                {
                    Err(AuthError::ExpiredToken)
                }
                _ => Err(AuthError::InvalidToken),
            },
        }
    }

    fn is_expired_unverified(&self, token: &str) -> bool {
        let mut validation = self.validation.clone();
        validation.insecure_disable_signature_validation();
        matches!(
            decode::<TokenClaims>(token, &self.decoding, &validation),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature)
        )
    }
}

/// Resolve the JWT secret: env var `JWT_SECRET` → `AUTH_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    if let Ok(secret) = std::env::var("JWT_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    if let Ok(secret) = std::env::var("AUTH_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    load_or_create_secret(&jwt_secret_path())
}

/// Read the secret persisted at `path`, generating and saving one if absent.
///
/// A secret that cannot be saved is still returned, but the next start will
/// generate a different one and every issued token stops verifying.
fn load_or_create_secret(path: &Path) -> String {
    if let Ok(existing) = std::fs::read_to_string(path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = path.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        warn!(path = %parent.display(), error = %e, "cannot create JWT secret directory");
    }
    match std::fs::write(path, &secret) {
        Ok(()) => info!(path = %path.display(), "generated new JWT secret"),
        Err(e) => warn!(
            path = %path.display(),
            error = %e,
            "generated JWT secret could not be persisted; tokens will not survive a restart"
        ),
    }
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("warden")
        .join("jwt-secret")
}
