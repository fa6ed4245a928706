//! Client-credentials token source with single-flight refresh.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::UpstreamError;

/// Refresh when the token expires within this window.
pub const REFRESH_SKEW: Duration = Duration::from_secs(30);

/// Upper bound on a cached token's lifetime, whatever `expires_in` says.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Attempt count and exponential backoff for token requests.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles after each failure.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (0-based): 1s, 2s, 4s, ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Successful response from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + REFRESH_SKEW < self.expires_at
    }
}

/// Obtains and caches an upstream bearer token.
///
/// Readers of a fresh token share a read lock. A refresh holds the write
/// lock for the whole fetch (including retries), and callers that queued
/// behind it re-check the token before fetching, so concurrent callers
/// racing an expiry produce one token request.
pub struct ClientCredentials {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    retry: RetryPolicy,
    token: RwLock<Option<CachedToken>>,
}

impl ClientCredentials {
    pub fn new(
        http: reqwest::Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            retry: RetryPolicy::default(),
            token: RwLock::new(None),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Return a token that is valid for at least [`REFRESH_SKEW`], fetching
    /// a new one if needed.
    pub async fn bearer_token(&self) -> Result<String, UpstreamError> {
        {
            let current = self.token.read().await;
            if let Some(token) = current.as_ref().filter(|t| t.is_fresh(Instant::now())) {
                return Ok(token.access_token.clone());
            }
        }

        let mut current = self.token.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(token) = current.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            debug!("upstream token refreshed by concurrent caller");
            return Ok(token.access_token.clone());
        }

        let fresh = self.fetch_with_retry().await?;
        let access_token = fresh.access_token.clone();
        *current = Some(fresh);
        Ok(access_token)
    }

    async fn fetch_with_retry(&self) -> Result<CachedToken, UpstreamError> {
        let mut reason = String::from("no attempts made");
        for attempt in 0..self.retry.max_attempts {
            match self.fetch().await {
                Ok(token) => {
                    info!(attempt = attempt + 1, "obtained upstream access token");
                    return Ok(token);
                }
                Err(e) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.retry.max_attempts,
                        ?delay,
                        error = %e,
                        "upstream token request failed"
                    );
                    reason = e;
                    tokio::time::sleep(delay).await;
                }
            }
        }
        Err(UpstreamError::Credential {
            attempts: self.retry.max_attempts,
            reason,
        })
    }

    /// One token request. The result is only returned once fully parsed.
    async fn fetch(&self) -> Result<CachedToken, String> {
        let resp = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if resp.status() != StatusCode::OK {
            return Err(format!("token endpoint returned HTTP {}", resp.status()));
        }

        let body = resp
            .json::<TokenResponse>()
            .await
            .map_err(|e| format!("token response parse error: {e}"))?;

        let lifetime = Duration::from_secs(body.expires_in).min(MAX_TOKEN_LIFETIME);
        Ok(CachedToken {
            access_token: body.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }
}
