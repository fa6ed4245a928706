//! API server configuration.

use std::time::Duration;

/// Default bound on a single durable read during a request.
pub const DEFAULT_STORE_READ_TIMEOUT_MS: u64 = 2_000;

/// Client-credentials settings for the upstream service.
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    /// Token endpoint (form POST, `grant_type=client_credentials`).
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl UpstreamConfig {
    /// Present only when `UPSTREAM_TOKEN_URL`, `UPSTREAM_CLIENT_ID` and
    /// `UPSTREAM_CLIENT_SECRET` are all set.
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Some(Self {
            token_url: var("UPSTREAM_TOKEN_URL")?,
            client_id: var("UPSTREAM_CLIENT_ID")?,
            client_secret: var("UPSTREAM_CLIENT_SECRET")?,
        })
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// Redis URL for the shared credential cache; `None` uses an
    /// in-process cache.
    pub redis_url: Option<String>,
    /// JWT signing secret. Read once at startup.
    pub jwt_secret: String,
    /// Bound on durable reads made by the permission and session stages.
    pub store_read_timeout: Duration,
    /// Outbound client-credentials settings.
    pub upstream: Option<UpstreamConfig>,
}
