//! Crate-level error types.
//!
//! [`WalletError`] unifies every failure a caller can observe (bad
//! configuration, rejected input, ledger rejections, exhausted delivery,
//! pagination out of range) behind a single enum so callers can match on
//! the variant they care about while still using `?` for propagation.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, WalletError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// A precondition on the client setup is not met: empty credentials,
    /// no player selected, or durable delivery without a backend.
    #[error("configuration error: {0}")]
    Config(String),

    /// Input was rejected before any request was made.
    #[error("validation error: {0}")]
    Validation(String),

    /// The ledger answered with a 4xx status. Never retried.
    #[error("seamless wallet service [{status}]: {body}")]
    ClientRequest { status: u16, body: String },

    /// Every attempt ended in a 5xx, a timeout or a connection failure.
    ///
    /// `status` is `None` when the last attempt never received a response;
    /// `body` then holds the transport failure.
    #[error("seamless wallet service failed after {attempts} attempt(s) [{}]: {body}", status_label(.status))]
    DeliveryFailed {
        attempts: u32,
        status: Option<u16>,
        body: String,
    },

    /// Pagination navigation left the `1..=last_page` range.
    #[error("no such page: {page} - valid range is 1 to {last_page} - for endpoint: {path}")]
    NoSuchPage {
        page: u32,
        last_page: u32,
        path: String,
    },

    /// A successful response did not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The durable queue backend could not persist a request.
    #[error("durable queue error: {0}")]
    Queue(String),

    /// The HTTP client could not be constructed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "no response".to_string(), |s| s.to_string())
}
