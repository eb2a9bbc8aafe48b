//! Wallet owners, outgoing transaction requests and ledger transaction snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::context::TransactionContext;
use crate::WalletError;

/// Opaque identity of a wallet owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for PlayerId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of a deposit or withdraw request.
///
/// The `transaction_id` is the ledger's idempotency key: it is fixed at
/// construction and reused unchanged on every retry of the request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRequest {
    amount: Decimal,
    transaction_id: Uuid,
    #[serde(rename = "transaction_context")]
    context: TransactionContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_id: Option<Uuid>,
}

impl TransactionRequest {
    /// Validates and builds a transaction request.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Validation`] if `amount` is not positive or
    /// either id is not a UUID.
    pub fn new(
        amount: Decimal,
        transaction_id: &str,
        context: TransactionContext,
        external_id: Option<&str>,
    ) -> crate::Result<Self> {
        if amount <= Decimal::ZERO {
            return Err(WalletError::Validation(format!(
                "amount must be positive, got {amount}"
            )));
        }

        let transaction_id = parse_uuid("transaction id", transaction_id)?;
        let external_id = external_id
            .map(|id| parse_uuid("external id", id))
            .transpose()?;

        Ok(Self {
            amount,
            transaction_id,
            context,
            external_id,
        })
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn transaction_id(&self) -> Uuid {
        self.transaction_id
    }

    pub fn context(&self) -> TransactionContext {
        self.context
    }

    pub fn external_id(&self) -> Option<Uuid> {
        self.external_id
    }
}

/// Parses a client supplied identifier, naming the field on failure.
pub(crate) fn parse_uuid(field: &str, raw: &str) -> crate::Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| WalletError::Validation(format!("{field} {raw:?} is not a valid UUID: {e}")))
}

/// Immutable snapshot of one ledger transaction.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Transaction {
    pub id: u64,
    pub wallet_id: u64,
    pub amount: Decimal,
    pub transaction_type_id: u8,
    pub transaction_context_id: u8,
    #[serde(default)]
    pub external_id: Option<String>,
    /// Wallet balance right after this transaction was applied.
    #[serde(default)]
    pub new_balance: Option<Decimal>,
    #[serde(default)]
    pub rolled_back_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Returns the typed context, or `None` for an id this client does not know.
    pub fn context(&self) -> Option<TransactionContext> {
        TransactionContext::try_from(self.transaction_context_id).ok()
    }

    pub fn is_rolled_back(&self) -> bool {
        self.rolled_back_at.is_some()
    }
}
