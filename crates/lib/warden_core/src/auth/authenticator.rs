//! The [`Authenticator`]: signing secret plus store and cache handles.
//!
//! Every inbound stage is a method on this value. The HTTP layer only
//! extracts inputs from the request and maps the result.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use uuid::Uuid;

use super::password::verify_password;
use super::{AuthContext, AuthError, TokenCodec};
use crate::cache::{CacheError, CredentialCache, DEFAULT_VERSION_TTL};
use crate::store::{StoreError, UserStore};

/// Upper bound for a single durable read made on behalf of a request.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

/// Strip the `Bearer ` prefix from an `Authorization` header value.
///
/// A missing header or a different scheme yields an empty token, which
/// then fails to decode.
pub fn bearer_token(header: Option<&str>) -> &str {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .unwrap_or("")
}

/// Authenticates and authorizes inbound requests.
pub struct Authenticator {
    pub(crate) codec: TokenCodec,
    pub(crate) store: Arc<dyn UserStore>,
    pub(crate) cache: Arc<dyn CredentialCache>,
    pub(crate) version_ttl: Duration,
    pub(crate) read_timeout: Duration,
}

impl Authenticator {
    pub fn new(
        codec: TokenCodec,
        store: Arc<dyn UserStore>,
        cache: Arc<dyn CredentialCache>,
    ) -> Self {
        Self {
            codec,
            store,
            cache,
            version_ttl: DEFAULT_VERSION_TTL,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Override how long a confirmed security version stays cached.
    pub fn with_version_ttl(mut self, ttl: Duration) -> Self {
        self.version_ttl = ttl;
        self
    }

    /// Override the bound on durable reads.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Verify a username/password pair and issue an access token carrying
    /// the user's role, permission slugs and current security version.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let user = match self.bounded(self.store.find_by_username(username)).await? {
            Some(user) => user,
            None => {
                debug!("login rejected: unknown username");
                return Err(AuthError::CredentialError);
            }
        };

        if !verify_password(password, &user.password_hash) {
            debug!(user_id = %user.id, "login rejected: wrong password");
            return Err(AuthError::CredentialError);
        }

        let token = self.codec.issue(
            user.id,
            &user.role.name,
            user.role.permission_slugs(),
            user.security_version,
        )?;
        Ok(IssuedToken {
            token,
            expires_in: self.codec.expiry_secs(),
        })
    }

    /// Authentication stage: decode the bearer token from an `Authorization`
    /// header value. Pure; performs no I/O.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<AuthContext, AuthError> {
        let token = bearer_token(authorization);
        let claims = self.codec.decode(token).inspect_err(|e| {
            debug!(error = %e, "authentication rejected");
        })?;
        Ok(AuthContext::from(claims))
    }

    /// Run a durable read under the configured timeout.
    pub(crate) async fn bounded<T>(
        &self,
        read: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.read_timeout, read)
            .await
            .map_err(|_| StoreError::Timeout(self.read_timeout))?
    }

    /// Run a cache call under the same bound as durable reads.
    pub(crate) async fn bounded_cache<T>(
        &self,
        call: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.read_timeout, call)
            .await
            .map_err(|_| CacheError::Timeout(self.read_timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use crate::cache::memory::MemoryCredentialCache;
    use crate::models::auth::{Permission, Role};
    use crate::store::memory::MemoryUserStore;

    fn authenticator() -> (Authenticator, Arc<MemoryUserStore>, Uuid) {
        let store = Arc::new(MemoryUserStore::new());
        store.insert_role(Role {
            id: 2,
            name: "accountant".into(),
            permissions: vec![Permission {
                id: 10,
                name: "View finance".into(),
                slug: "FIN_VIEW".into(),
            }],
        });
        let user_id = store
            .insert_user("alice", "alice@example.com", &hash_password("s3cret-pass").unwrap(), 2)
            .unwrap();
        let auth = Authenticator::new(
            TokenCodec::new(b"test-secret").unwrap(),
            store.clone(),
            Arc::new(MemoryCredentialCache::new()),
        );
        (auth, store, user_id)
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        assert_eq!(bearer_token(Some("Bearer abc.def")), "abc.def");
        assert_eq!(bearer_token(Some("Basic abc")), "");
        assert_eq!(bearer_token(Some("bearer abc")), "");
        assert_eq!(bearer_token(None), "");
    }

    #[tokio::test]
    async fn login_issues_token_with_role_permissions_and_version() {
        let (auth, store, user_id) = authenticator();
        let issued = auth.login("alice", "s3cret-pass").await.unwrap();
        assert_eq!(issued.expires_in, 24 * 60 * 60);

        let header = format!("Bearer {}", issued.token);
        let ctx = auth.authenticate(Some(&header)).unwrap();
        assert_eq!(ctx.user_id, user_id);
        assert_eq!(ctx.role, "accountant");
        assert!(ctx.has_permission("FIN_VIEW"));
        let user = store.user(user_id).unwrap();
        assert_eq!(ctx.security_version, user.security_version);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (auth, _, _) = authenticator();
        assert!(matches!(
            auth.login("alice", "wrong").await,
            Err(AuthError::CredentialError)
        ));
        assert!(matches!(
            auth.login("mallory", "s3cret-pass").await,
            Err(AuthError::CredentialError)
        ));
    }

    #[test]
    fn missing_header_is_invalid_token() {
        let (auth, _, _) = authenticator();
        assert!(matches!(auth.authenticate(None), Err(AuthError::InvalidToken)));
        assert!(matches!(
            auth.authenticate(Some("Token abc")),
            Err(AuthError::InvalidToken)
        ));
    }
}
