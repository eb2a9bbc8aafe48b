//! Delivery of requests to the ledger service.
//!
//! This module is organized by delivery path:
//! - [`sync`] - immediate delivery with bounded retry
//! - [`durable`] - hand-off to a persistent queue for later delivery
//! - [`router`] - per-request choice between the two
//! - [`http`] - the HTTP seam the synchronous path runs on

pub mod durable;
pub mod http;
pub mod router;
pub mod sync;

use std::fmt;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;
use zeroize::Zeroizing;

use crate::auth::basic_authorization;
use crate::config::WalletConfig;

pub use durable::{DurableDispatcher, DurableQueue, FileQueue, QueuedRequest};
pub use http::{HttpTransport, RawResponse, ReqwestTransport, TransportFailure};
pub use router::{DispatchRouter, Route};
pub use sync::{RetryPolicy, RetryState, SynchronousDispatcher};

/// HTTP verbs the ledger API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Returns `true` for verbs that change ledger state.
    pub fn is_mutating(self) -> bool {
        matches!(self, Method::Post)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
        }
    }
}

/// A fully resolved request: absolute URL, query, JSON body and headers.
#[derive(Clone, PartialEq)]
pub struct LedgerRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub payload: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
}

impl fmt::Debug for LedgerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("LedgerRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("query", &self.query)
            .field("payload", &self.payload)
            .field("headers", &header_names)
            .finish()
    }
}

/// Builds requests against one ledger service with its credentials attached.
#[derive(Clone)]
pub struct LedgerEndpoint {
    base_url: String,
    authorization: Zeroizing<String>,
}

impl LedgerEndpoint {
    pub fn new(config: &WalletConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            authorization: basic_authorization(&config.username, &config.password),
        }
    }

    /// Returns the absolute URL for an API path such as `/api/v1/...`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Builds a read request carrying `query` as the query string.
    pub fn get(&self, path: &str, query: Vec<(String, String)>) -> LedgerRequest {
        LedgerRequest {
            method: Method::Get,
            url: self.url(path),
            query,
            payload: None,
            headers: self.headers(),
        }
    }

    /// Builds a mutating request carrying `payload` as its JSON body.
    pub fn post(&self, path: &str, payload: serde_json::Value) -> LedgerRequest {
        LedgerRequest {
            method: Method::Post,
            url: self.url(path),
            query: Vec::new(),
            payload: Some(payload),
            headers: self.headers(),
        }
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
            ("Authorization".to_string(), self.authorization.as_str().to_string()),
        ]
    }
}

impl fmt::Debug for LedgerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerEndpoint")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Outcome of handing a request to a delivery path.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportResult {
    /// The ledger executed the request and answered with a 2xx.
    Synchronous(LedgerResponse),
    /// The request was persisted for later delivery and has not executed yet.
    Accepted,
}

impl TransportResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TransportResult::Accepted)
    }

    pub fn as_synchronous(&self) -> Option<&LedgerResponse> {
        match self {
            TransportResult::Synchronous(response) => Some(response),
            TransportResult::Accepted => None,
        }
    }

    /// Returns the synchronous response, failing if the request was only queued.
    ///
    /// Read requests never take the durable path, so callers use this to
    /// unwrap their result.
    pub fn into_synchronous(self) -> crate::Result<LedgerResponse> {
        match self {
            TransportResult::Synchronous(response) => Ok(response),
            TransportResult::Accepted => Err(crate::WalletError::Config(
                "expected an immediate response but the request was queued".to_string(),
            )),
        }
    }
}

/// A 2xx answer from the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerResponse {
    pub status: u16,
    /// Resulting wallet balance, when the body carries one.
    pub balance: Option<Decimal>,
    pub body: serde_json::Value,
    pub raw_body: String,
}

impl LedgerResponse {
    pub fn from_raw(raw: RawResponse) -> Self {
        let body = if raw.body.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&raw.body).unwrap_or_else(|e| {
                warn!(status = raw.status, error = %e, "ledger response is not JSON");
                serde_json::Value::Null
            })
        };
        let balance = body
            .get("balance")
            .and_then(|value| serde_json::from_value(value.clone()).ok());

        Self {
            status: raw.status,
            balance,
            body,
            raw_body: raw.body,
        }
    }

    /// Deserializes the JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::MalformedResponse`](crate::WalletError::MalformedResponse)
    /// if the body does not have the expected shape.
    pub fn parse<T: DeserializeOwned>(&self) -> crate::Result<T> {
        serde_json::from_value(self.body.clone()).map_err(|e| {
            crate::WalletError::MalformedResponse(format!("{e} in body: {}", self.raw_body))
        })
    }
}
