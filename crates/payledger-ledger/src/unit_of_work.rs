//! Atomic multi-record writes.
//!
//! A [`UnitOfWork`] is an ordered list of [`LedgerWrite`]s that a
//! [`LedgerStore`](crate::LedgerStore) applies all-or-nothing. Later writes may
//! refer to records inserted earlier in the same unit.

use payledger_types::{
    Bonus, BonusActivation, BonusId, CryptoPayment, CryptoPaymentId, CryptoPaymentStatus,
    Transaction, TransactionId, TransactionStatus, UserId, WithdrawalId, WithdrawalRequest,
};
use rust_decimal::Decimal;

/// One mutation inside a unit of work.
#[derive(Debug, Clone)]
pub enum LedgerWrite {
    InsertTransaction(Transaction),
    /// Fails the unit with `DuplicatePayment` if the provider id is taken.
    InsertCryptoPayment(CryptoPayment),
    InsertWithdrawal(WithdrawalRequest),
    InsertBonus(Bonus),
    /// Set the payment's back-reference to its ledger entry.
    LinkPaymentTransaction {
        payment: CryptoPaymentId,
        transaction: TransactionId,
    },
    /// Set the withdrawal's back-reference to its ledger entry.
    LinkWithdrawalTransaction {
        withdrawal: WithdrawalId,
        transaction: TransactionId,
    },
    /// Guarded: the status must move the payment forward (see
    /// `CryptoPaymentStatus::advance_to`); otherwise the unit is rejected with
    /// `StaleWrite { entity: CryptoPayment }`.
    SetPaymentStatus {
        payment: CryptoPaymentId,
        status: CryptoPaymentStatus,
    },
    /// pending → processing, recording the provider payout id.
    MarkWithdrawalProcessing {
        withdrawal: WithdrawalId,
        payout_id: String,
    },
    /// pending | processing → failed.
    MarkWithdrawalFailed { withdrawal: WithdrawalId },
    /// Guarded: only applies from `pending`; otherwise the unit is rejected
    /// with `StaleWrite { entity: Transaction }`.
    TransitionTransaction {
        transaction: TransactionId,
        to: TransactionStatus,
    },
    /// Guarded: only applies from `PENDING_ACTIVATION`; otherwise the unit is
    /// rejected with `StaleWrite { entity: Bonus }`.
    ActivateBonus {
        bonus: BonusId,
        activation: BonusActivation,
    },
    /// Guard evaluated against the ledger as staged so far: the user's
    /// available balance must be at least `amount`, else `InsufficientFunds`.
    RequireAvailable { user: UserId, amount: Decimal },
}

/// An all-or-nothing group of ledger writes.
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    /// Names the flow step in logs (e.g., "deposit.create").
    pub label: &'static str,
    pub writes: Vec<LedgerWrite>,
}

impl UnitOfWork {
    #[must_use]
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            writes: Vec::new(),
        }
    }

    /// Append a write. Builder-style.
    #[must_use]
    pub fn push(mut self, write: LedgerWrite) -> Self {
        self.writes.push(write);
        self
    }

    /// Append several writes. Builder-style.
    #[must_use]
    pub fn extend(mut self, writes: impl IntoIterator<Item = LedgerWrite>) -> Self {
        self.writes.extend(writes);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}
