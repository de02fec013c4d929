use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::currency::Currency;
use crate::wallet::UserId;

/// Unique funding deal identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DealId(pub String);

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a funding deal.
///
/// Completing is the only transition with a side effect: it posts the
/// funding pair on the ledger. Completed and cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealStatus {
    Pending,
    Approved,
    Completed,
    Cancelled,
}

impl DealStatus {
    /// Returns true if moving from self to `next` is a legal transition.
    pub fn can_transition_to(&self, next: &DealStatus) -> bool {
        matches!(
            (self, next),
            (DealStatus::Pending, DealStatus::Approved)
                | (DealStatus::Pending, DealStatus::Cancelled)
                | (DealStatus::Approved, DealStatus::Completed)
                | (DealStatus::Approved, DealStatus::Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DealStatus::Completed | DealStatus::Cancelled)
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DealStatus::Pending => write!(f, "pending"),
            DealStatus::Approved => write!(f, "approved"),
            DealStatus::Completed => write!(f, "completed"),
            DealStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// An equity funding deal between an investor and an entrepreneur.
///
/// `amount` and `equity` are frozen once the deal completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingDeal {
    pub id: DealId,
    pub investor_id: UserId,
    pub entrepreneur_id: UserId,
    /// Deal size in minor units.
    pub amount: i64,
    pub currency: Currency,
    /// Equity offered, percent in (0, 100].
    pub equity: f64,
    pub status: DealStatus,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
