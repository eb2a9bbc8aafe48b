//! Seamless wallet ledger client library.
//!
//! Moves money (deposit, withdraw, rollback) against a remote wallet
//! ledger, either immediately with bounded retry or through a durable
//! queue, keeps a process-local memo of confirmed balances, and pages
//! through filtered transaction history with a replayable cursor.

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod pager;
pub mod transport;

pub use cache::{BalanceCache, CacheScope, WalletStore};
pub use client::WalletClient;
pub use config::{WalletConfig, fetch_config};
pub use error::{Result, WalletError};
pub use models::{PlayerId, Transaction, TransactionContext};
pub use pager::{PaginationState, TransactionPage, TransactionPager};
pub use transport::TransportResult;
