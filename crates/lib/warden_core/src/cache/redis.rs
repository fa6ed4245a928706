//! Redis-backed credential cache, shared across API instances.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use uuid::Uuid;

use super::{CacheError, CredentialCache, version_key};

/// Stores `user_ver:{user_id}` → security version with `SET EX`.
#[derive(Clone)]
pub struct RedisCredentialCache {
    redis: ConnectionManager,
}

impl RedisCredentialCache {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    /// Open a managed connection to `redis_url`.
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(manager))
    }
}

#[async_trait]
impl CredentialCache for RedisCredentialCache {
    async fn get(&self, user_id: Uuid) -> Result<Option<Uuid>, CacheError> {
        let mut conn = self.redis.clone();
        let value: Option<String> = conn.get(version_key(user_id)).await?;
        value
            .map(|v| Uuid::parse_str(&v).map_err(|e| CacheError::Invalid(e.to_string())))
            .transpose()
    }

    async fn set(&self, user_id: Uuid, version: Uuid, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.redis.clone();
        // SET EX rejects 0; a sub-second TTL rounds up.
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(version_key(user_id), version.to_string(), seconds)
            .await?;
        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), CacheError> {
        let mut conn = self.redis.clone();
        conn.del::<_, ()>(version_key(user_id)).await?;
        Ok(())
    }
}
