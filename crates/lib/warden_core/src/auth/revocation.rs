//! Session validity via security-version stamps.
//!
//! The cache is consulted first; on a miss (or an unreachable cache) the
//! durable stamp decides, and a match is written back so the next request
//! skips the store. A request only proceeds after matching either a cached
//! or a durable value.

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{AuthContext, AuthError, Authenticator};

impl Authenticator {
    /// Revocation stage: reject tokens minted before the user's last
    /// security event.
    pub async fn validate_session(&self, ctx: &AuthContext) -> Result<(), AuthError> {
        match self.bounded_cache(self.cache.get(ctx.user_id)).await {
            Ok(Some(cached)) if cached == ctx.security_version => return Ok(()),
            Ok(Some(_)) => {
                debug!(user_id = %ctx.user_id, "security version mismatch (cache)");
                return Err(AuthError::SessionRevoked);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(user_id = %ctx.user_id, error = %e, "credential cache read failed, using store");
            }
        }

        let current = match self.bounded(self.store.security_version(ctx.user_id)).await {
            Ok(Some(version)) => version,
            Ok(None) => {
                debug!(user_id = %ctx.user_id, "session check: user not found");
                return Err(AuthError::InvalidSession);
            }
            Err(e) => {
                warn!(user_id = %ctx.user_id, error = %e, "session check: store read failed");
                return Err(AuthError::InvalidSession);
            }
        };

        if current != ctx.security_version {
            debug!(user_id = %ctx.user_id, "security version mismatch (store)");
            return Err(AuthError::InvalidSession);
        }

        if let Err(e) = self
            .bounded_cache(self.cache.set(ctx.user_id, current, self.version_ttl))
            .await
        {
            warn!(user_id = %ctx.user_id, error = %e, "credential cache write failed");
        }
        Ok(())
    }

    /// Move a user to another role and rotate their security version,
    /// revoking every token issued before the change.
    ///
    /// The cache entry is deleted (not overwritten) after the store commits,
    /// so the next request re-reads the new stamp. A failed delete is logged
    /// and left to expire with the entry's TTL.
    pub async fn update_user_role(&self, user_id: Uuid, role_id: i64) -> Result<Uuid, AuthError> {
        let version = Uuid::new_v4();
        self.store
            .update_role_and_version(user_id, role_id, version)
            .await?;
        info!(%user_id, role_id, "role updated, security version rotated");

        if let Err(e) = self.bounded_cache(self.cache.delete(user_id)).await {
            warn!(%user_id, error = %e, "credential cache delete failed; entry will expire via TTL");
        }
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::auth::TokenCodec;
    use crate::cache::memory::MemoryCredentialCache;
    use crate::cache::{CacheError, CredentialCache};
    use crate::models::auth::{Role, User};
    use crate::store::memory::MemoryUserStore;
    use crate::store::{StoreError, UserStore};

    /// Wraps the in-memory store and counts security-version reads.
    struct CountingStore {
        inner: MemoryUserStore,
        version_reads: AtomicU32,
    }

    #[async_trait]
    impl UserStore for CountingStore {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            self.inner.find_by_id(id).await
        }
        async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
            self.inner.find_by_username(username).await
        }
        async fn security_version(&self, id: Uuid) -> Result<Option<Uuid>, StoreError> {
            self.version_reads.fetch_add(1, Ordering::SeqCst);
            self.inner.security_version(id).await
        }
        async fn update_role_and_version(
            &self,
            id: Uuid,
            role_id: i64,
            version: Uuid,
        ) -> Result<(), StoreError> {
            self.inner.update_role_and_version(id, role_id, version).await
        }
    }

    /// Cache that keeps working for reads and writes but can fail deletes,
    /// or fail everything when `down` is set.
    struct FlakyCache {
        inner: MemoryCredentialCache,
        fail_delete: bool,
        down: AtomicBool,
    }

    #[async_trait]
    impl CredentialCache for FlakyCache {
        async fn get(&self, user_id: Uuid) -> Result<Option<Uuid>, CacheError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(CacheError::Unavailable("down".into()));
            }
            self.inner.get(user_id).await
        }
        async fn set(&self, user_id: Uuid, version: Uuid, ttl: Duration) -> Result<(), CacheError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(CacheError::Unavailable("down".into()));
            }
            self.inner.set(user_id, version, ttl).await
        }
        async fn delete(&self, user_id: Uuid) -> Result<(), CacheError> {
            if self.fail_delete || self.down.load(Ordering::SeqCst) {
                return Err(CacheError::Unavailable("delete failed".into()));
            }
            self.inner.delete(user_id).await
        }
    }

    struct Fixture {
        auth: Authenticator,
        store: Arc<CountingStore>,
        cache: Arc<FlakyCache>,
        user_id: Uuid,
    }

    fn fixture(fail_delete: bool) -> Fixture {
        let inner = MemoryUserStore::new();
        inner.insert_role(Role {
            id: 1,
            name: "user".into(),
            permissions: vec![],
        });
        inner.insert_role(Role {
            id: 2,
            name: "admin".into(),
            permissions: vec![],
        });
        let user_id = inner.insert_user("carol", "carol@example.com", "x", 1).unwrap();
        let store = Arc::new(CountingStore {
            inner,
            version_reads: AtomicU32::new(0),
        });
        let cache = Arc::new(FlakyCache {
            inner: MemoryCredentialCache::new(),
            fail_delete,
            down: AtomicBool::new(false),
        });
        let auth = Authenticator::new(
            TokenCodec::new(b"test-secret").unwrap(),
            store.clone(),
            cache.clone(),
        );
        Fixture {
            auth,
            store,
            cache,
            user_id,
        }
    }

    fn session(f: &Fixture) -> AuthContext {
        let user = f.store.inner.user(f.user_id).unwrap();
        AuthContext {
            user_id: user.id,
            role: user.role.name,
            permissions: Default::default(),
            security_version: user.security_version,
            expires_at: i64::MAX,
        }
    }

    fn reads(f: &Fixture) -> u32 {
        f.store.version_reads.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn miss_reads_store_then_hit_skips_it() {
        let f = fixture(false);
        let ctx = session(&f);

        f.auth.validate_session(&ctx).await.unwrap();
        assert_eq!(reads(&f), 1);
        assert_eq!(
            f.cache.inner.get(f.user_id).await.unwrap(),
            Some(ctx.security_version)
        );

        f.auth.validate_session(&ctx).await.unwrap();
        f.auth.validate_session(&ctx).await.unwrap();
        assert_eq!(reads(&f), 1);
    }

    #[tokio::test]
    async fn repopulating_same_version_is_idempotent() {
        let f = fixture(false);
        let ctx = session(&f);
        for _ in 0..3 {
            f.cache
                .inner
                .set(f.user_id, ctx.security_version, Duration::from_secs(60))
                .await
                .unwrap();
            assert!(f.auth.validate_session(&ctx).await.is_ok());
        }
        assert_eq!(reads(&f), 0);
    }

    #[tokio::test]
    async fn cached_mismatch_is_session_revoked() {
        let f = fixture(false);
        let ctx = session(&f);
        f.cache
            .inner
            .set(f.user_id, Uuid::new_v4(), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(matches!(
            f.auth.validate_session(&ctx).await,
            Err(AuthError::SessionRevoked)
        ));
        assert_eq!(reads(&f), 0);
    }

    #[tokio::test]
    async fn store_mismatch_is_invalid_session_and_not_cached() {
        let f = fixture(false);
        let mut ctx = session(&f);
        ctx.security_version = Uuid::new_v4();
        assert!(matches!(
            f.auth.validate_session(&ctx).await,
            Err(AuthError::InvalidSession)
        ));
        assert_eq!(f.cache.inner.get(f.user_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_user_is_invalid_session() {
        let f = fixture(false);
        let mut ctx = session(&f);
        ctx.user_id = Uuid::new_v4();
        assert!(matches!(
            f.auth.validate_session(&ctx).await,
            Err(AuthError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn role_update_revokes_previous_token() {
        let f = fixture(false);
        let old = session(&f);
        f.auth.validate_session(&old).await.unwrap();

        let new_version = f.auth.update_user_role(f.user_id, 2).await.unwrap();
        assert_ne!(new_version, old.security_version);
        assert_eq!(f.cache.inner.get(f.user_id).await.unwrap(), None);

        assert!(matches!(
            f.auth.validate_session(&old).await,
            Err(AuthError::InvalidSession)
        ));

        let fresh = session(&f);
        assert_eq!(fresh.role, "admin");
        assert!(f.auth.validate_session(&fresh).await.is_ok());
    }

    #[tokio::test]
    async fn unreachable_cache_falls_back_to_store() {
        let f = fixture(true);
        let old = session(&f);
        f.cache.down.store(true, Ordering::SeqCst);

        assert!(f.auth.validate_session(&old).await.is_ok());
        f.auth.update_user_role(f.user_id, 2).await.unwrap();

        assert!(matches!(
            f.auth.validate_session(&old).await,
            Err(AuthError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn failed_delete_is_bounded_by_ttl() {
        let f = fixture(true);
        let auth = Authenticator::new(
            TokenCodec::new(b"test-secret").unwrap(),
            f.store.clone(),
            f.cache.clone(),
        )
        .with_version_ttl(Duration::from_millis(50));
        let old = session(&f);
        auth.validate_session(&old).await.unwrap();

        // Delete fails: the stale entry still answers until it expires.
        auth.update_user_role(f.user_id, 2).await.unwrap();
        assert!(auth.validate_session(&old).await.is_ok());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(matches!(
            auth.validate_session(&old).await,
            Err(AuthError::InvalidSession)
        ));
    }

    /// Cache whose calls never complete, like a stalled Redis connection.
    struct StalledCache;

    #[async_trait]
    impl CredentialCache for StalledCache {
        async fn get(&self, _user_id: Uuid) -> Result<Option<Uuid>, CacheError> {
            std::future::pending().await
        }
        async fn set(&self, _user_id: Uuid, _version: Uuid, _ttl: Duration) -> Result<(), CacheError> {
            std::future::pending().await
        }
        async fn delete(&self, _user_id: Uuid) -> Result<(), CacheError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_cache_falls_back_to_store_within_bound() {
        let f = fixture(false);
        let auth = Authenticator::new(
            TokenCodec::new(b"test-secret").unwrap(),
            f.store.clone(),
            Arc::new(StalledCache),
        )
        .with_read_timeout(Duration::from_secs(2));
        let old = session(&f);

        let outcome = tokio::time::timeout(Duration::from_secs(10), auth.validate_session(&old))
            .await
            .expect("session check must not hang on the cache");
        assert!(outcome.is_ok());
        assert_eq!(reads(&f), 1);

        tokio::time::timeout(Duration::from_secs(10), auth.update_user_role(f.user_id, 2))
            .await
            .expect("role update must not hang on the cache")
            .unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(10), auth.validate_session(&old))
            .await
            .expect("session check must not hang on the cache");
        assert!(matches!(outcome, Err(AuthError::InvalidSession)));
    }

    #[tokio::test]
    async fn role_update_for_unknown_user_fails() {
        let f = fixture(false);
        assert!(matches!(
            f.auth.update_user_role(Uuid::new_v4(), 2).await,
            Err(AuthError::Store(StoreError::NotFound))
        ));
    }
}
