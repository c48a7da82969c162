use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use tracing::warn;

use crate::error::CognitoError;

/// HTTP capability used to download a JWKS document.
pub trait JwksFetcher: Send + Sync + 'static {
    /// GET `url` and return the response body. Transport failures and
    /// non-success statuses are reported as [`CognitoError::JwksFetch`].
    fn fetch<'a>(&'a self, url: &'a str) -> Pin<Box<dyn Future<Output = Result<Bytes, CognitoError>> + Send + 'a>>;
}

/// [`JwksFetcher`] backed by `reqwest`, with every request bounded by a timeout.
#[derive(Clone)]
pub struct ReqwestJwksFetcher {
    client: reqwest::Client,
}

impl ReqwestJwksFetcher {
    /// Build a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, CognitoError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CognitoError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Reuse an existing client. Its timeout settings are kept as-is.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl JwksFetcher for ReqwestJwksFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> Pin<Box<dyn Future<Output = Result<Bytes, CognitoError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self.client.get(url).send().await.map_err(|e| {
                warn!(%url, error = %e, "JWKS request failed");
                CognitoError::JwksFetch(e.to_string())
            })?;

            let response = response.error_for_status().map_err(|e| {
                warn!(%url, error = %e, "JWKS endpoint returned an error status");
                CognitoError::JwksFetch(e.to_string())
            })?;

            response
                .bytes()
                .await
                .map_err(|e| CognitoError::JwksFetch(format!("Failed to read JWKS body: {e}")))
        })
    }
}
