//! Shared models for the ledger service API.
//!
//! Contains the transaction context catalogue, the request body sent for
//! money movements, transaction snapshots, and the paginator wire shape
//! returned by the transaction listing endpoint.

pub mod context;
pub mod page;
pub mod transaction;

pub use context::TransactionContext;
pub use page::{PaginatorBody, PaginatorLink, TransactionsResponse};
pub use transaction::{PlayerId, Transaction, TransactionRequest};

use rust_decimal::Decimal;
use serde::Deserialize;

/// Response body of balance reads and of deposit/withdraw.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    pub balance: Decimal,
}

/// Response body of the aggregate balance metric.
#[derive(Debug, Clone, Deserialize)]
pub struct SumResponse {
    pub sum: Decimal,
}

/// Body of the wallet creation request.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CreateWalletRequest<'a> {
    pub player_id: &'a PlayerId,
}
