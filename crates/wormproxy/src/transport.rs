use crate::ProxyConfig;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tokio::net::TcpStream;
use wormcore::{ProxyError, TransportError};

const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(3);

/// Outbound network access used by the resolver and fetcher.
///
/// One attempt per call; retries are the caller's business.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Whether any network is reachable at all
    async fn is_online(&self) -> bool;

    /// Lightweight existence check; `Ok(false)` means the server said no
    async fn probe(&self, url: &Url) -> Result<bool, TransportError>;

    /// Download a resource body
    async fn get(&self, url: &Url) -> Result<Vec<u8>, TransportError>;
}

/// HTTP(S) transport backed by reqwest
pub struct HttpTransport {
    client: reqwest::Client,
    connectivity_probe: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ProxyError::NetworkError(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            client,
            connectivity_probe: config.connectivity_probe.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn is_online(&self) -> bool {
        let Some(addr) = self.connectivity_probe.as_deref() else {
            return true;
        };
        match tokio::time::timeout(CONNECTIVITY_TIMEOUT, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!("Connectivity probe {} failed: {}", addr, e);
                false
            }
            Err(_) => {
                tracing::debug!("Connectivity probe {} timed out", addr);
                false
            }
        }
    }

    async fn probe(&self, url: &Url) -> Result<bool, TransportError> {
        let response = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let status = response.status();
        tracing::debug!("HEAD {} -> {}", url, status);

        // Some static hosts refuse HEAD outright
        if status == StatusCode::METHOD_NOT_ALLOWED {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| TransportError::Connection(e.to_string()))?;
            return Ok(response.status().is_success());
        }
        Ok(status.is_success())
    }

    async fn get(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        tracing::debug!("GET {} -> {} bytes", url, body.len());
        Ok(body.to_vec())
    }
}
