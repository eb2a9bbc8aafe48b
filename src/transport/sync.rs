//! Immediate delivery with bounded retry.
//!
//! Each request moves through [`RetryState`]:
//! `Attempting(n) -> Success | ClientError | Attempting(n + 1) | Exhausted`.
//! A 2xx ends in `Success`, a 4xx ends in `ClientError` without retrying,
//! anything else (other statuses, timeouts, connection failures) is
//! retried until `max_attempts` is reached. The request is resent
//! byte-for-byte, so the ledger sees the same `transaction_id` on every
//! attempt and deduplicates it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use super::http::{HttpTransport, RawResponse, TransportFailure};
use super::{LedgerRequest, LedgerResponse, TransportResult};
use crate::WalletError;

/// Retry behaviour of the synchronous path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Pause between two attempts.
    pub delay: Duration,
    /// Upper bound on a single attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
            timeout: Duration::from_secs(1),
        }
    }
}

/// Position of one request in the retry state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState {
    /// Attempt `n` (1-based) is about to run.
    Attempting(u32),
    Success(RawResponse),
    ClientError(RawResponse),
    /// No attempt succeeded; `last` is what the final attempt produced.
    Exhausted {
        attempts: u32,
        last: Result<RawResponse, TransportFailure>,
    },
}

impl RetryPolicy {
    /// Computes the state that follows attempt number `attempt`.
    pub fn advance(
        &self,
        attempt: u32,
        outcome: Result<RawResponse, TransportFailure>,
    ) -> RetryState {
        match outcome {
            Ok(response) if response.is_success() => RetryState::Success(response),
            Ok(response) if response.is_client_error() => RetryState::ClientError(response),
            last if attempt >= self.max_attempts => RetryState::Exhausted {
                attempts: attempt,
                last,
            },
            _ => RetryState::Attempting(attempt + 1),
        }
    }
}

/// Sends requests to the ledger and waits for a definitive answer.
pub struct SynchronousDispatcher {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
}

impl SynchronousDispatcher {
    pub fn new(transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Delivers `request`, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::ClientRequest`] on a 4xx and
    /// [`WalletError::DeliveryFailed`] once every attempt failed transiently.
    pub async fn send(&self, request: &LedgerRequest) -> crate::Result<TransportResult> {
        let mut state = RetryState::Attempting(1);

        loop {
            state = match state {
                RetryState::Attempting(attempt) => {
                    if attempt > 1 {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                    let outcome = self.attempt(request).await;
                    let next = self.policy.advance(attempt, outcome);
                    if let RetryState::Attempting(_) = &next {
                        warn!(
                            method = request.method.as_str(),
                            url = %request.url,
                            attempt,
                            max_attempts = self.policy.max_attempts,
                            "transient ledger failure, retrying"
                        );
                    }
                    next
                }
                RetryState::Success(response) => {
                    debug!(
                        method = request.method.as_str(),
                        url = %request.url,
                        status = response.status,
                        "ledger request succeeded"
                    );
                    return Ok(TransportResult::Synchronous(LedgerResponse::from_raw(
                        response,
                    )));
                }
                RetryState::ClientError(response) => {
                    warn!(
                        method = request.method.as_str(),
                        url = %request.url,
                        status = response.status,
                        "ledger rejected request"
                    );
                    return Err(WalletError::ClientRequest {
                        status: response.status,
                        body: response.body,
                    });
                }
                RetryState::Exhausted { attempts, last } => {
                    let (status, body) = match last {
                        Ok(response) => (Some(response.status), response.body),
                        Err(failure) => (None, failure.to_string()),
                    };
                    error!(
                        method = request.method.as_str(),
                        url = %request.url,
                        attempts,
                        status = ?status,
                        "ledger request failed after all attempts"
                    );
                    return Err(WalletError::DeliveryFailed {
                        attempts,
                        status,
                        body,
                    });
                }
            };
        }
    }

    /// Runs one attempt bounded by the per-attempt timeout.
    async fn attempt(&self, request: &LedgerRequest) -> Result<RawResponse, TransportFailure> {
        let call = self.transport.execute(request, self.policy.timeout);
        match tokio::time::timeout(self.policy.timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(TransportFailure::Timeout),
        }
    }
}
