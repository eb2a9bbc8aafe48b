//! HTTP seam of the synchronous delivery path.
//!
//! [`HttpTransport`] performs exactly one attempt; retry and classification
//! live in [`sync`](super::sync). [`ReqwestTransport`] is the production
//! implementation, tests substitute scripted transports.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::{LedgerRequest, Method};

/// Status and body of one HTTP exchange, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

/// An attempt that produced no HTTP response at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connection(String),
}

/// Executes a single request against the ledger.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(
        &self,
        request: &LedgerRequest,
        timeout: Duration,
    ) -> Result<RawResponse, TransportFailure>;
}

/// [`HttpTransport`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Http`](crate::WalletError::Http) if the TLS
    /// backend cannot be initialised.
    pub fn new() -> crate::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client))
    }

    /// Wraps an already configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        request: &LedgerRequest,
        timeout: Duration,
    ) -> Result<RawResponse, TransportFailure> {
        let mut builder = match request.method {
            Method::Get => self.client.get(request.url.as_str()).query(&request.query),
            Method::Post => self.client.post(request.url.as_str()),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(payload) = &request.payload {
            builder = builder.json(payload);
        }

        let response = builder.timeout(timeout).send().await.map_err(failure)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(failure)?;

        Ok(RawResponse { status, body })
    }
}

fn failure(error: reqwest::Error) -> TransportFailure {
    if error.is_timeout() {
        TransportFailure::Timeout
    } else {
        TransportFailure::Connection(error.to_string())
    }
}
