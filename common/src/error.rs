use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::currency::Currency;
use crate::deal::DealStatus;

/// Everything that can go wrong inside the ledger core.
///
/// Every operation reports failure as one of these values; nothing is
/// swallowed, and the core never retries. The HTTP layer maps variants onto
/// status codes using [`LedgerError::kind`].
#[derive(Clone, Debug, PartialEq, Error, Serialize, Deserialize)]
pub enum LedgerError {
    #[error("no wallet for user {0}")]
    WalletNotFound(String),

    #[error("user {0} already has a wallet")]
    WalletExists(String),

    #[error("no funding deal {0}")]
    DealNotFound(String),

    #[error("insufficient funds: have {available}, need {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch {
        expected: Currency,
        found: Currency,
    },

    #[error("illegal deal transition: {from} → {to}")]
    InvalidTransition { from: DealStatus, to: DealStatus },

    #[error("validation failed: {0}")]
    Validation(String),
}

impl LedgerError {
    /// Stable taxonomy name carried in API error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::WalletNotFound(_) | LedgerError::DealNotFound(_) => "NotFound",
            LedgerError::WalletExists(_) => "WalletExists",
            LedgerError::InsufficientFunds { .. } => "InsufficientFunds",
            LedgerError::CurrencyMismatch { .. } => "CurrencyMismatch",
            LedgerError::InvalidTransition { .. } => "InvalidTransition",
            LedgerError::Validation(_) => "ValidationError",
        }
    }
}
