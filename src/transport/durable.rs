//! Hand-off of mutations to a persistent queue for guaranteed delivery.
//!
//! The queue backend owns retries and delivery; this side only persists the
//! request and reports [`TransportResult::Accepted`]. Nothing here waits on
//! the ledger, so no balance is known when a request is accepted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use super::{LedgerRequest, Method, TransportResult};
use crate::WalletError;

/// A request as handed to the queue backend.
///
/// Headers are stored as-is, including `Authorization`, because the
/// delivery worker replays the request without access to the credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedRequest {
    pub method: Method,
    pub url: String,
    pub payload: serde_json::Value,
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
}

/// Storage that guarantees at-least-once eventual delivery of what it persists.
#[async_trait]
pub trait DurableQueue: Send + Sync {
    /// Persists `request` outside process memory.
    async fn persist(&self, request: QueuedRequest) -> crate::Result<()>;
}

/// Enqueues mutating requests instead of sending them.
#[derive(Clone)]
pub struct DurableDispatcher {
    queue: Arc<dyn DurableQueue>,
}

impl DurableDispatcher {
    pub fn new(queue: Arc<dyn DurableQueue>) -> Self {
        Self { queue }
    }

    /// Persists `request` for later delivery.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Config`] for read requests, which have no
    /// meaningful deferred form, and [`WalletError::Queue`] if the backend
    /// cannot persist the request.
    pub async fn enqueue(
        &self,
        request: &LedgerRequest,
        priority: Option<u32>,
    ) -> crate::Result<TransportResult> {
        if !request.method.is_mutating() {
            return Err(WalletError::Config(format!(
                "durable delivery only applies to mutating requests, got {} {}",
                request.method.as_str(),
                request.url
            )));
        }

        let queued = QueuedRequest {
            method: request.method,
            url: request.url.clone(),
            payload: request
                .payload
                .clone()
                .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new())),
            headers: request.headers.iter().cloned().collect(),
            priority,
        };
        self.queue.persist(queued).await?;
        info!(
            method = request.method.as_str(),
            url = %request.url,
            priority = ?priority,
            "request queued for durable delivery"
        );

        Ok(TransportResult::Accepted)
    }
}

/// JSON-lines file queue: one record per line, flushed to disk before
/// [`persist`](DurableQueue::persist) returns.
///
/// A separate delivery worker reads [`pending`](FileQueue::pending) records
/// and replays them.
#[derive(Debug)]
pub struct FileQueue {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileQueue {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads back every record persisted so far, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Queue`] if the file cannot be read and
    /// [`WalletError::Json`] if a record is corrupt.
    pub async fn pending(&self) -> crate::Result<Vec<QueuedRequest>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error("read", e)),
        };

        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(WalletError::from))
            .collect()
    }

    fn io_error(&self, action: &str, error: std::io::Error) -> WalletError {
        WalletError::Queue(format!(
            "failed to {action} {}: {error}",
            self.path().display()
        ))
    }
}

#[async_trait]
impl DurableQueue for FileQueue {
    async fn persist(&self, request: QueuedRequest) -> crate::Result<()> {
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error("open", e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.io_error("write", e))?;
        file.sync_data()
            .await
            .map_err(|e| self.io_error("sync", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalletConfig;
    use crate::transport::LedgerEndpoint;

    fn endpoint() -> LedgerEndpoint {
        LedgerEndpoint::new(&WalletConfig::new("http://ledger.local", "root", "secret123"))
    }

    #[tokio::test]
    async fn persists_requests_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(FileQueue::new(dir.path().join("queue.jsonl")));
        let dispatcher = DurableDispatcher::new(queue.clone());

        let first = endpoint().post("/api/v1/wallets/1/deposit", serde_json::json!({"amount": "100"}));
        let second = endpoint().post("/api/v1/wallets/1/withdraw", serde_json::json!({"amount": "5"}));

        assert!(dispatcher.enqueue(&first, None).await.unwrap().is_accepted());
        assert!(dispatcher.enqueue(&second, Some(10)).await.unwrap().is_accepted());

        let pending = queue.pending().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].url, "http://ledger.local/api/v1/wallets/1/deposit");
        assert_eq!(pending[0].method, Method::Post);
        assert_eq!(pending[0].payload["amount"], "100");
        assert_eq!(pending[0].priority, None);
        assert_eq!(pending[1].priority, Some(10));
        assert_eq!(
            pending[1].headers.get("Authorization").map(String::as_str),
            Some("Basic cm9vdDpzZWNyZXQxMjM=")
        );
    }

    #[tokio::test]
    async fn refuses_read_requests() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(FileQueue::new(dir.path().join("queue.jsonl")));
        let dispatcher = DurableDispatcher::new(queue.clone());

        let read = endpoint().get("/api/v1/wallets/1/balance", Vec::new());
        let err = dispatcher.enqueue(&read, None).await.unwrap_err();

        assert!(matches!(err, WalletError::Config(_)));
        assert!(queue.pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unwritable_location_is_a_queue_error() {
        let dir = tempfile::tempdir().unwrap();
        let queue = FileQueue::new(dir.path().join("missing").join("queue.jsonl"));
        let request = QueuedRequest {
            method: Method::Post,
            url: "http://ledger.local/x".into(),
            payload: serde_json::json!({}),
            headers: BTreeMap::new(),
            priority: None,
        };

        let err = queue.persist(request).await.unwrap_err();
        assert!(matches!(err, WalletError::Queue(_)));
        assert!(err.to_string().contains(&queue.path().display().to_string()));
    }
}
