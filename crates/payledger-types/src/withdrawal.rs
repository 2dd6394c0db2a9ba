//! Crypto withdrawal model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{TransactionId, UserId, WithdrawalId};

/// Lifecycle of a withdrawal request.
///
/// `pending → processing → completed | failed`, or `pending → failed` when
/// the payout call itself is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Processing,
    Failed,
    Completed,
}

impl WithdrawalStatus {
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Pending, Self::Failed)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Failed => write!(f, "failed"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// A user's request to pay out crypto to an external address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub id: WithdrawalId,
    pub user_id: UserId,
    /// Requested amount in the base currency.
    pub amount: Decimal,
    /// Target crypto asset code.
    pub currency: String,
    pub address: String,
    /// Amount of `currency` sent to the provider.
    pub crypto_amount: Decimal,
    pub base_amount: Decimal,
    pub base_currency: String,
    pub status: WithdrawalStatus,
    pub payout_id: Option<String>,
    /// Back-reference to the paired ledger entry.
    pub transaction_id: Option<TransactionId>,
    pub created_at: DateTime<Utc>,
}
