//! Transaction context catalogue.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Business reason attached to every ledger transaction.
///
/// Serialized as the numeric id the ledger stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TransactionContext {
    #[default]
    None,
    SpinPrize,
    SpinCost,
    BingoPurchase,
    Jackpot,
    BingoMegaPrize,
    BingoWin,
    Bonus,
    BonusCanceled,
    Payout,
    PayoutCanceled,
    LeftoverBalance,
    Manual,
    Payment,
    PaymentCanceled,
}

impl TransactionContext {
    /// Every context in id order.
    pub const ALL: [TransactionContext; 15] = [
        Self::None,
        Self::SpinPrize,
        Self::SpinCost,
        Self::BingoPurchase,
        Self::Jackpot,
        Self::BingoMegaPrize,
        Self::BingoWin,
        Self::Bonus,
        Self::BonusCanceled,
        Self::Payout,
        Self::PayoutCanceled,
        Self::LeftoverBalance,
        Self::Manual,
        Self::Payment,
        Self::PaymentCanceled,
    ];

    /// Returns the wire id used by the ledger.
    pub fn id(self) -> u8 {
        match self {
            Self::None => 1,
            Self::SpinPrize => 2,
            Self::SpinCost => 3,
            Self::BingoPurchase => 4,
            Self::Jackpot => 5,
            Self::BingoMegaPrize => 6,
            Self::BingoWin => 7,
            Self::Bonus => 8,
            Self::BonusCanceled => 9,
            Self::Payout => 10,
            Self::PayoutCanceled => 11,
            Self::LeftoverBalance => 12,
            Self::Manual => 13,
            Self::Payment => 14,
            Self::PaymentCanceled => 15,
        }
    }
}

impl TryFrom<u8> for TransactionContext {
    type Error = crate::WalletError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|context| context.id() == id)
            .ok_or_else(|| crate::WalletError::Validation(format!("unknown transaction context: {id}")))
    }
}

impl From<TransactionContext> for u8 {
    fn from(context: TransactionContext) -> Self {
        context.id()
    }
}

impl fmt::Display for TransactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}
