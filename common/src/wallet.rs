use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::currency::Currency;
use crate::deal::DealId;

/// Unique wallet identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WalletId(pub String);

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform user identifier (investor or entrepreneur).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user's wallet. `balance` is a derived cache over the completed ledger
/// entries for this wallet; postings keep the two in lockstep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: WalletId,
    pub user_id: UserId,
    /// Balance in minor units (cents). Never negative after a commit.
    pub balance: i64,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a ledger entry records. Transfers and funding events always come in
/// debit/credit pairs; the rest are single entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    Transfer,
    Funding,
    Payment,
}

impl TransactionKind {
    /// Prefix used in generated posting references ("TRF-…", "FUND-…").
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEP",
            TransactionKind::Withdraw => "WD",
            TransactionKind::Transfer => "TRF",
            TransactionKind::Funding => "FUND",
            TransactionKind::Payment => "PAY",
        }
    }
}

/// Lifecycle of a ledger entry. Completed entries are immutable and count
/// toward the wallet balance; the others do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

/// Posting context carried on an entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMetadata {
    /// Set on the two entries posted when a funding deal completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<DealId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    /// Shared reference linking this entry to the counterparty's matching
    /// entry in a paired posting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// A single movement of value on one wallet.
///
/// Amounts are signed: negative leaves the wallet, positive enters it. A
/// logical transfer is recorded as two of these sharing a reference and
/// summing to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: u64,
    pub wallet_id: WalletId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Signed amount in minor units.
    pub amount: i64,
    pub currency: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<UserId>,
    pub description: String,
    pub status: TransactionStatus,
    #[serde(default)]
    pub metadata: TransactionMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sum the completed entries in `entries` that touch `wallet`.
pub fn balance_from_entries<'a, I>(wallet: &WalletId, entries: I) -> i64
where
    I: IntoIterator<Item = &'a Transaction>,
{
    entries
        .into_iter()
        .filter(|tx| tx.wallet_id == *wallet && tx.status == TransactionStatus::Completed)
        .map(|tx| tx.amount)
        .sum()
}
