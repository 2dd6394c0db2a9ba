//! Ledger transaction model.
//!
//! A [`Transaction`] is the unit the balance is computed from. Amounts are in
//! the platform base currency regardless of which crypto asset moved.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{TransactionId, UserId};

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
}

/// Settlement state of a ledger entry.
///
/// Only `Pending → Success` and `Pending → Fail` exist; terminal states never
/// change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Fail,
}

impl TransactionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether `self → next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Success) | (Self::Pending, Self::Fail)
        )
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// What produced the entry: a cash movement or a promotional credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionCategory {
    Transaction,
    Bonus,
}

/// A history filter outside the known categories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown transaction category: {0}")]
pub struct UnknownCategory(pub String);

impl std::str::FromStr for TransactionCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transaction" => Ok(Self::Transaction),
            "bonus" => Ok(Self::Bonus),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// A single ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    /// Base-currency amount, always positive; direction comes from `tx_type`.
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub category: TransactionCategory,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// A new pending cash entry.
    #[must_use]
    pub fn pending(
        user_id: UserId,
        tx_type: TransactionType,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            user_id,
            tx_type,
            amount,
            status: TransactionStatus::Pending,
            category: TransactionCategory::Transaction,
            description: description.into(),
            created_at: Utc::now(),
        }
    }

    /// A settled promotional credit.
    #[must_use]
    pub fn bonus_credit(user_id: UserId, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            id: TransactionId::new(),
            user_id,
            tx_type: TransactionType::Deposit,
            amount,
            status: TransactionStatus::Success,
            category: TransactionCategory::Bonus,
            description: description.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_leaves_pending() {
        use TransactionStatus::*;
        assert!(Pending.can_transition_to(Success));
        assert!(Pending.can_transition_to(Fail));
        assert!(!Success.can_transition_to(Fail));
        assert!(!Fail.can_transition_to(Success));
        assert!(!Success.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
        assert!(Success.is_terminal() && Fail.is_terminal() && !Pending.is_terminal());
    }

    #[test]
    fn pending_entry_defaults() {
        let user = UserId::new();
        let tx = Transaction::pending(user, TransactionType::Withdrawal, Decimal::new(30, 0), "w");
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.category, TransactionCategory::Transaction);
        assert_eq!(tx.user_id, user);
    }

    #[test]
    fn bonus_credit_is_settled_deposit() {
        let tx = Transaction::bonus_credit(UserId::new(), Decimal::new(500, 0), "Bonus credit");
        assert_eq!(tx.tx_type, TransactionType::Deposit);
        assert_eq!(tx.status, TransactionStatus::Success);
        assert_eq!(tx.category, TransactionCategory::Bonus);
    }

    #[test]
    fn wire_casing_matches_records() {
        let tx = Transaction::pending(UserId::new(), TransactionType::Deposit, Decimal::ONE, "d");
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "deposit");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["category"], "transaction");
        assert!(json.get("userId").is_some());
    }

    #[test]
    fn category_parses() {
        assert_eq!("bonus".parse::<TransactionCategory>(), Ok(TransactionCategory::Bonus));
        assert_eq!(
            "slots".parse::<TransactionCategory>(),
            Err(UnknownCategory("slots".into()))
        );
        assert_eq!(
            UnknownCategory("slots".into()).to_string(),
            "unknown transaction category: slots"
        );
    }
}
