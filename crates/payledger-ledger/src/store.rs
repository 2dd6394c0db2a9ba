//! The ledger store contract the settlement engine is written against.

use async_trait::async_trait;
use payledger_types::{
    Bonus, CryptoPayment, ExternalPaymentId, Result, Transaction, TransactionId, UserId,
    WithdrawalId, WithdrawalRequest,
};

use crate::UnitOfWork;

/// Durable, transactional storage of ledger records.
///
/// Implementations must apply a [`UnitOfWork`] atomically: if any write in
/// it fails, no write in it is visible to readers.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Apply every write of `unit` or none of them.
    async fn commit(&self, unit: UnitOfWork) -> Result<()>;

    async fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>>;

    /// All entries of a user, oldest first.
    async fn transactions_for_user(&self, user: UserId) -> Result<Vec<Transaction>>;

    async fn crypto_payment_by_external_id(
        &self,
        payment_id: &ExternalPaymentId,
    ) -> Result<Option<CryptoPayment>>;

    async fn withdrawal(&self, id: WithdrawalId) -> Result<Option<WithdrawalRequest>>;

    /// Bonuses of deposit-activated kinds still waiting for a deposit.
    async fn pending_deposit_bonuses(&self, user: UserId) -> Result<Vec<Bonus>>;

    async fn bonuses_for_user(&self, user: UserId) -> Result<Vec<Bonus>>;
}
