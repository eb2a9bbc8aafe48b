//! Per-request choice of delivery path.

use std::sync::Arc;

use super::durable::DurableDispatcher;
use super::sync::SynchronousDispatcher;
use super::{LedgerRequest, Method, TransportResult};
use crate::WalletError;

/// Delivery path picked for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Synchronous,
    Durable,
}

/// Routes reads to the synchronous path and mutations to the durable path
/// when the session asks for it.
///
/// The decision is made on every call; the durable flag belongs to the
/// caller's session and may change between calls.
pub struct DispatchRouter {
    synchronous: Arc<SynchronousDispatcher>,
    durable: Option<DurableDispatcher>,
}

impl DispatchRouter {
    pub fn new(synchronous: Arc<SynchronousDispatcher>, durable: Option<DurableDispatcher>) -> Self {
        Self {
            synchronous,
            durable,
        }
    }

    pub fn synchronous(&self) -> &Arc<SynchronousDispatcher> {
        &self.synchronous
    }

    pub fn has_durable_backend(&self) -> bool {
        self.durable.is_some()
    }

    /// Decides which path a request with `method` takes.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Config`] when a mutation asks for durable
    /// delivery but no queue backend is configured. There is no silent
    /// fallback to the synchronous path.
    pub fn route(&self, method: Method, durable_mode: bool) -> crate::Result<Route> {
        if !method.is_mutating() || !durable_mode {
            return Ok(Route::Synchronous);
        }
        if self.durable.is_none() {
            return Err(WalletError::Config(
                "durable delivery requested but no durable queue is configured".to_string(),
            ));
        }
        Ok(Route::Durable)
    }

    /// Delivers `request` on the path [`route`](Self::route) picks.
    pub async fn dispatch(
        &self,
        request: &LedgerRequest,
        durable_mode: bool,
        priority: Option<u32>,
    ) -> crate::Result<TransportResult> {
        match (self.route(request.method, durable_mode)?, &self.durable) {
            (Route::Durable, Some(durable)) => durable.enqueue(request, priority).await,
            _ => self.synchronous.send(request).await,
        }
    }

    /// Delivers `request` synchronously regardless of the session's mode.
    pub async fn send_synchronous(&self, request: &LedgerRequest) -> crate::Result<TransportResult> {
        self.synchronous.send(request).await
    }
}
