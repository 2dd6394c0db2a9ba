//! Crypto deposit model and the provider status state machine.
//!
//! ```text
//! PENDING → CONFIRMING → CONFIRMED → FINISHED
//!    └───────────┴───────────┴─────→ FAILED | EXPIRED
//! ```
//!
//! Provider status strings are parsed by a total function over a closed set
//! ([`ProviderStatus`]); anything else is an error, never a silent default.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CryptoPaymentId, ExternalPaymentId, TransactionId, TransactionStatus, UserId};

/// Status vocabulary of the payment provider's notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Waiting,
    Confirming,
    Confirmed,
    Finished,
    Failed,
    Expired,
}

/// A provider status string outside the known vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown provider status: {0:?}")]
pub struct UnknownProviderStatus(pub String);

impl FromStr for ProviderStatus {
    type Err = UnknownProviderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "confirming" => Ok(Self::Confirming),
            "confirmed" => Ok(Self::Confirmed),
            "finished" => Ok(Self::Finished),
            "failed" => Ok(Self::Failed),
            "expired" => Ok(Self::Expired),
            other => Err(UnknownProviderStatus(other.to_string())),
        }
    }
}

impl ProviderStatus {
    /// The ledger transition this status settles the deposit into, if any.
    #[must_use]
    pub fn settles_to(self) -> Option<TransactionStatus> {
        match self {
            Self::Finished => Some(TransactionStatus::Success),
            Self::Failed | Self::Expired => Some(TransactionStatus::Fail),
            Self::Waiting | Self::Confirming | Self::Confirmed => None,
        }
    }
}

/// Internal lifecycle of a crypto deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CryptoPaymentStatus {
    Pending,
    Confirming,
    Confirmed,
    Finished,
    Failed,
    Expired,
}

impl From<ProviderStatus> for CryptoPaymentStatus {
    fn from(status: ProviderStatus) -> Self {
        match status {
            ProviderStatus::Waiting => Self::Pending,
            ProviderStatus::Confirming => Self::Confirming,
            ProviderStatus::Confirmed => Self::Confirmed,
            ProviderStatus::Finished => Self::Finished,
            ProviderStatus::Failed => Self::Failed,
            ProviderStatus::Expired => Self::Expired,
        }
    }
}

impl CryptoPaymentStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Expired)
    }

    fn progress(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Confirming => 1,
            Self::Confirmed => 2,
            Self::Finished | Self::Failed | Self::Expired => 3,
        }
    }

    /// The status to store when a notification reporting `next` arrives.
    ///
    /// Returns `None` when the notification would not move the payment
    /// forward: terminal states are final and non-terminal states never
    /// regress (notifications can arrive out of order).
    #[must_use]
    pub fn advance_to(self, next: Self) -> Option<Self> {
        if self.is_terminal() || next.progress() <= self.progress() {
            return None;
        }
        Some(next)
    }
}

impl fmt::Display for CryptoPaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Confirming => write!(f, "CONFIRMING"),
            Self::Confirmed => write!(f, "CONFIRMED"),
            Self::Finished => write!(f, "FINISHED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// A deposit routed through the crypto payment provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CryptoPayment {
    pub id: CryptoPaymentId,
    pub user_id: UserId,
    /// Provider-issued id; unique across all payments.
    pub payment_id: ExternalPaymentId,
    pub order_id: String,
    pub pay_address: String,
    pub pay_currency: String,
    pub pay_amount: Decimal,
    pub price_amount: Decimal,
    pub price_currency: String,
    /// Amount credited to the ledger, in the base currency.
    pub base_amount: Decimal,
    pub base_currency: String,
    pub status: CryptoPaymentStatus,
    pub expires_at: Option<DateTime<Utc>>,
    /// Back-reference to the paired ledger entry.
    pub transaction_id: Option<TransactionId>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_vocabulary_parses() {
        for (raw, expected) in [
            ("waiting", ProviderStatus::Waiting),
            ("confirming", ProviderStatus::Confirming),
            ("confirmed", ProviderStatus::Confirmed),
            ("finished", ProviderStatus::Finished),
            ("failed", ProviderStatus::Failed),
            ("expired", ProviderStatus::Expired),
        ] {
            assert_eq!(raw.parse::<ProviderStatus>(), Ok(expected));
        }
    }

    #[test]
    fn unknown_status_is_an_error() {
        let err = "partially_paid".parse::<ProviderStatus>().unwrap_err();
        assert_eq!(err.0, "partially_paid");
        assert_eq!(err.to_string(), r#"unknown provider status: "partially_paid""#);
        assert!("FINISHED".parse::<ProviderStatus>().is_err());
        assert!("".parse::<ProviderStatus>().is_err());
    }

    #[test]
    fn mapping_is_one_to_one() {
        assert_eq!(
            CryptoPaymentStatus::from(ProviderStatus::Waiting),
            CryptoPaymentStatus::Pending
        );
        assert_eq!(
            CryptoPaymentStatus::from(ProviderStatus::Finished),
            CryptoPaymentStatus::Finished
        );
        assert_eq!(
            CryptoPaymentStatus::from(ProviderStatus::Expired),
            CryptoPaymentStatus::Expired
        );
    }

    #[test]
    fn settlement_targets() {
        assert_eq!(ProviderStatus::Finished.settles_to(), Some(TransactionStatus::Success));
        assert_eq!(ProviderStatus::Failed.settles_to(), Some(TransactionStatus::Fail));
        assert_eq!(ProviderStatus::Expired.settles_to(), Some(TransactionStatus::Fail));
        assert_eq!(ProviderStatus::Confirmed.settles_to(), None);
    }

    #[test]
    fn advance_moves_forward_only() {
        use CryptoPaymentStatus::*;
        assert_eq!(Pending.advance_to(Confirming), Some(Confirming));
        assert_eq!(Pending.advance_to(Finished), Some(Finished));
        assert_eq!(Confirmed.advance_to(Expired), Some(Expired));
        assert_eq!(Confirmed.advance_to(Pending), None);
        assert_eq!(Confirming.advance_to(Confirming), None);
    }

    #[test]
    fn terminal_states_are_final() {
        use CryptoPaymentStatus::*;
        assert_eq!(Finished.advance_to(Failed), None);
        assert_eq!(Failed.advance_to(Finished), None);
        assert_eq!(Expired.advance_to(Confirming), None);
    }

    #[test]
    fn status_serializes_screaming() {
        let json = serde_json::to_string(&CryptoPaymentStatus::Confirming).unwrap();
        assert_eq!(json, "\"CONFIRMING\"");
        assert_eq!(CryptoPaymentStatus::Confirming.to_string(), "CONFIRMING");
    }
}
