//! Outbound calls to an upstream service authenticated with a
//! client-credentials bearer token.
//!
//! [`ClientCredentials`] owns the token lifecycle (fetch, cache, refresh
//! near expiry, retry with backoff). [`AuthorizedClient`] decorates a
//! `reqwest::Client` so every request carries a current token.

pub mod client;
pub mod credentials;

pub use client::AuthorizedClient;
pub use credentials::{ClientCredentials, RetryPolicy};

use thiserror::Error;

/// Errors from outbound calls.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// No token could be obtained after all attempts.
    #[error("Upstream credential error after {attempts} attempt(s): {reason}")]
    Credential { attempts: u32, reason: String },

    #[error("Upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
}
