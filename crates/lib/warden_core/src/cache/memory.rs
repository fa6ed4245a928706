//! In-process credential cache with per-entry TTL.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;
use uuid::Uuid;

use super::{CacheError, CredentialCache};

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    version: Uuid,
    expires_at: Instant,
}

/// Concurrent map of user ID → security version. Used when no Redis URL is
/// configured (single-instance deployments) and in tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialCache {
    entries: DashMap<Uuid, CacheEntry>,
}

impl MemoryCredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict expired entries.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }

    /// Spawn a periodic cleanup task.
    pub fn spawn_cleanup_task(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                cache.cleanup();
            }
        })
    }
}

#[async_trait]
impl CredentialCache for MemoryCredentialCache {
    async fn get(&self, user_id: Uuid) -> Result<Option<Uuid>, CacheError> {
        let entry = match self.entries.get(&user_id) {
            Some(entry) => *entry,
            None => return Ok(None),
        };
        if Instant::now() < entry.expires_at {
            return Ok(Some(entry.version));
        }
        self.entries
            .remove_if(&user_id, |_, e| e.expires_at <= Instant::now());
        Ok(None)
    }

    async fn set(&self, user_id: Uuid, version: Uuid, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now() + ttl;
        self.entries
            .insert(user_id, CacheEntry { version, expires_at });
        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), CacheError> {
        self.entries.remove(&user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn get_returns_none_for_missing_key() {
        let cache = MemoryCredentialCache::new();
        assert!(cache.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_and_get_roundtrip() {
        let cache = MemoryCredentialCache::new();
        let (user, version) = (Uuid::new_v4(), Uuid::new_v4());
        cache.set(user, version, HOUR).await.unwrap();
        assert_eq!(cache.get(user).await.unwrap(), Some(version));
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let cache = MemoryCredentialCache::new();
        let user = Uuid::new_v4();
        cache.set(user, Uuid::new_v4(), HOUR).await.unwrap();
        cache.delete(user).await.unwrap();
        assert!(cache.get(user).await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss() {
        let cache = MemoryCredentialCache::new();
        let user = Uuid::new_v4();
        cache.set(user, Uuid::new_v4(), Duration::ZERO).await.unwrap();
        assert!(cache.get(user).await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reads_do_not_extend_ttl_but_writes_do() {
        let cache = MemoryCredentialCache::new();
        let (user, version) = (Uuid::new_v4(), Uuid::new_v4());
        cache.set(user, version, HOUR).await.unwrap();

        tokio::time::advance(Duration::from_secs(1800)).await;
        assert_eq!(cache.get(user).await.unwrap(), Some(version));
        tokio::time::advance(Duration::from_secs(1801)).await;
        assert!(cache.get(user).await.unwrap().is_none());

        cache.set(user, version, HOUR).await.unwrap();
        tokio::time::advance(Duration::from_secs(1800)).await;
        cache.set(user, version, HOUR).await.unwrap();
        tokio::time::advance(Duration::from_secs(1800)).await;
        assert_eq!(cache.get(user).await.unwrap(), Some(version));
    }

    #[tokio::test]
    async fn cleanup_evicts_only_expired() {
        let cache = MemoryCredentialCache::new();
        let live = Uuid::new_v4();
        cache.set(live, Uuid::new_v4(), HOUR).await.unwrap();
        cache.set(Uuid::new_v4(), Uuid::new_v4(), Duration::ZERO).await.unwrap();
        assert_eq!(cache.len(), 2);
        cache.cleanup();
        assert_eq!(cache.len(), 1);
        assert!(cache.get(live).await.unwrap().is_some());
    }
}
