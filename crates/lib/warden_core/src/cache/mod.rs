//! Fast-tier cache of users' security-version stamps.
//!
//! The cache is advisory: a read failure falls back to the store and a
//! write failure is logged and ignored. Entries only ever hold a value that
//! was just confirmed against the store.

pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// How long a confirmed security version stays cached: 24 hours, matching
/// the access token lifetime.
pub const DEFAULT_VERSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors from a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid cached value: {0}")]
    Invalid(String),

    #[error("Cache call timed out after {0:?}")]
    Timeout(Duration),
}

/// Key/value store mapping a user ID to its security-version stamp.
#[async_trait]
pub trait CredentialCache: Send + Sync {
    /// `Ok(None)` is a miss (absent or expired).
    async fn get(&self, user_id: Uuid) -> Result<Option<Uuid>, CacheError>;

    /// Store `version` for `ttl`, replacing any existing entry.
    async fn set(&self, user_id: Uuid, version: Uuid, ttl: Duration) -> Result<(), CacheError>;

    /// Remove the entry, if any.
    async fn delete(&self, user_id: Uuid) -> Result<(), CacheError>;
}

/// Cache key for a user's security version.
pub fn version_key(user_id: Uuid) -> String {
    format!("user_ver:{user_id}")
}
