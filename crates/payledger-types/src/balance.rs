//! Balance view derived from the ledger.
//!
//! ```text
//! successfulNet      = Σ success deposits − Σ success withdrawals
//! available          = successfulNet − Σ pending withdrawals
//! total              = successfulNet + Σ pending deposits
//! pending            = Σ pending deposits − Σ pending withdrawals
//! ```
//!
//! Pending withdrawals reserve funds so they cannot be spent twice while the
//! payout is in flight. Failed entries contribute nothing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Transaction, TransactionStatus, TransactionType};

/// A point-in-time balance for one user, in the base currency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceSnapshot {
    /// Spendable / withdrawable now.
    pub available: Decimal,
    /// Net effect of entries still awaiting settlement.
    pub pending: Decimal,
    /// Settled funds plus deposits still in flight.
    pub total: Decimal,
}

impl BalanceSnapshot {
    /// A zero balance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: Decimal::ZERO,
            pending: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }

    /// Fold a user's full transaction history into a snapshot.
    pub fn from_transactions<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut successful_net = Decimal::ZERO;
        let mut pending_deposits = Decimal::ZERO;
        let mut pending_withdrawals = Decimal::ZERO;

        for tx in transactions {
            match (tx.status, tx.tx_type) {
                (TransactionStatus::Success, TransactionType::Deposit) => successful_net += tx.amount,
                (TransactionStatus::Success, TransactionType::Withdrawal) => {
                    successful_net -= tx.amount;
                }
                (TransactionStatus::Pending, TransactionType::Deposit) => pending_deposits += tx.amount,
                (TransactionStatus::Pending, TransactionType::Withdrawal) => {
                    pending_withdrawals += tx.amount;
                }
                (TransactionStatus::Fail, _) => {}
            }
        }

        Self {
            available: successful_net - pending_withdrawals,
            pending: pending_deposits - pending_withdrawals,
            total: successful_net + pending_deposits,
        }
    }

    /// Whether `amount` can be withdrawn.
    #[must_use]
    pub fn covers(&self, amount: Decimal) -> bool {
        self.available >= amount
    }

    /// Whether this snapshot has no balance at all.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.available.is_zero() && self.pending.is_zero() && self.total.is_zero()
    }
}

impl Default for BalanceSnapshot {
    fn default() -> Self {
        Self::new()
    }
}
