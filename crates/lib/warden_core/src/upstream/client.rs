//! HTTP client decorator that attaches the upstream bearer token.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Request, Response};
use serde::Serialize;

use super::{ClientCredentials, UpstreamError};

/// `reqwest::Client` wrapper: every request is sent with
/// `Authorization: Bearer <token>` from [`ClientCredentials`].
///
/// If no token can be obtained the request is not sent.
#[derive(Clone)]
pub struct AuthorizedClient {
    http: reqwest::Client,
    credentials: Arc<ClientCredentials>,
}

impl AuthorizedClient {
    pub fn new(http: reqwest::Client, credentials: Arc<ClientCredentials>) -> Self {
        Self { http, credentials }
    }

    pub fn credentials(&self) -> &Arc<ClientCredentials> {
        &self.credentials
    }

    /// Attach the current token to `request` and send it.
    pub async fn execute(&self, mut request: Request) -> Result<Response, UpstreamError> {
        let token = self.credentials.bearer_token().await?;
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            UpstreamError::Credential {
                attempts: 1,
                reason: "access token is not a valid header value".into(),
            }
        })?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(self.http.execute(request).await?)
    }

    /// `GET url` with the bearer token.
    pub async fn get(&self, url: &str) -> Result<Response, UpstreamError> {
        let request = self.http.get(url).build()?;
        self.execute(request).await
    }

    /// `POST url` with a JSON body and the bearer token.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<Response, UpstreamError> {
        let request = self.http.post(url).json(body).build()?;
        self.execute(request).await
    }
}
