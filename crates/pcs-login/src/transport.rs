//! HTTP transport seam.
//!
//! The handshake only needs "send a request, give me the body". Keeping that
//! behind a trait lets callers bring their own configured client (cookies,
//! proxy, TLS) and lets tests count requests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use rustls::ClientConfig;
use rustls::crypto::aws_lc_rs;
use rustls_platform_verifier::BuilderVerifierExt;
use tracing::debug;

use crate::error::{LoginError, Result};

/// Request timeout of [`default_client`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and returns the response body.
    ///
    /// Non-success HTTP statuses are reported as [`LoginError::Transport`].
    async fn fetch(
        &self,
        method: Method,
        url: &str,
        body: Option<Bytes>,
        headers: HeaderMap,
    ) -> Result<Bytes>;

    async fn get(&self, url: &str, headers: HeaderMap) -> Result<Bytes> {
        self.fetch(Method::GET, url, None, headers).await
    }
}

#[async_trait]
impl Transport for Client {
    async fn fetch(
        &self,
        method: Method,
        url: &str,
        body: Option<Bytes>,
        headers: HeaderMap,
    ) -> Result<Bytes> {
        let mut request = self.request(method.clone(), url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        debug!(%method, url, len = bytes.len(), "Fetched response");
        Ok(bytes)
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn fetch(
        &self,
        method: Method,
        url: &str,
        body: Option<Bytes>,
        headers: HeaderMap,
    ) -> Result<Bytes> {
        (**self).fetch(method, url, body, headers).await
    }
}

/// Builds the HTTP client used when the caller does not supply one.
///
/// Uses the platform certificate verifier and keeps cookies between requests.
pub fn default_client() -> Result<Client> {
    let provider = Arc::new(aws_lc_rs::default_provider());
    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| LoginError::Tls(e.to_string()))?
        .with_platform_verifier()
        .map_err(|e| LoginError::Tls(e.to_string()))?
        .with_no_client_auth();

    let client = Client::builder()
        .use_preconfigured_tls(tls_config)
        .cookie_store(true)
        .timeout(DEFAULT_TIMEOUT)
        .build()?;
    Ok(client)
}
