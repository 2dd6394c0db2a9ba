//! In-memory reference implementation of [`LedgerStore`].
//!
//! Commits apply writes in place under the write lock and record the prior
//! value of every touched key. A failing write replays that log in reverse,
//! so a rejected unit leaves no trace and a commit costs only what it touches.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use payledger_types::{
    BalanceSnapshot, Bonus, BonusId, BonusStatus, CryptoPayment, CryptoPaymentId,
    ExternalPaymentId, PayledgerError, Result, StaleEntity, Transaction, TransactionId, UserId,
    WithdrawalId, WithdrawalRequest, WithdrawalStatus,
};
use tokio::sync::RwLock;

use crate::{LedgerStore, LedgerWrite, UnitOfWork};

#[derive(Debug, Default)]
struct LedgerState {
    transactions: HashMap<TransactionId, Transaction>,
    /// Per-user entries in insertion order.
    user_transactions: HashMap<UserId, Vec<TransactionId>>,
    payments: HashMap<CryptoPaymentId, CryptoPayment>,
    /// Unique index on the provider payment id.
    payments_by_external: HashMap<ExternalPaymentId, CryptoPaymentId>,
    withdrawals: HashMap<WithdrawalId, WithdrawalRequest>,
    bonuses: HashMap<BonusId, Bonus>,
}

/// Prior value of one key touched by the unit being applied.
#[derive(Debug)]
enum Undo {
    Transaction(TransactionId, Option<Transaction>),
    /// Drop the last id pushed onto the user's index.
    UserIndex(UserId),
    Payment(CryptoPaymentId, Option<CryptoPayment>),
    ExternalIndex(ExternalPaymentId),
    Withdrawal(WithdrawalId, Option<WithdrawalRequest>),
    Bonus(BonusId, Option<Bonus>),
}

fn restore<K: std::hash::Hash + Eq, V>(map: &mut HashMap<K, V>, key: K, prior: Option<V>) {
    match prior {
        Some(value) => {
            map.insert(key, value);
        }
        None => {
            map.remove(&key);
        }
    }
}

fn missing(entity: StaleEntity, id: impl ToString) -> PayledgerError {
    PayledgerError::RecordNotFound {
        entity,
        id: id.to_string(),
    }
}

impl LedgerState {
    fn apply(&mut self, write: LedgerWrite, undo: &mut Vec<Undo>) -> Result<()> {
        match write {
            LedgerWrite::InsertTransaction(tx) => {
                self.user_transactions
                    .entry(tx.user_id)
                    .or_default()
                    .push(tx.id);
                undo.push(Undo::UserIndex(tx.user_id));
                let id = tx.id;
                let prior = self.transactions.insert(id, tx);
                undo.push(Undo::Transaction(id, prior));
            }
            LedgerWrite::InsertCryptoPayment(payment) => {
                if self.payments_by_external.contains_key(&payment.payment_id) {
                    return Err(PayledgerError::DuplicatePayment(payment.payment_id));
                }
                self.payments_by_external
                    .insert(payment.payment_id.clone(), payment.id);
                undo.push(Undo::ExternalIndex(payment.payment_id.clone()));
                let id = payment.id;
                let prior = self.payments.insert(id, payment);
                undo.push(Undo::Payment(id, prior));
            }
            LedgerWrite::InsertWithdrawal(withdrawal) => {
                let id = withdrawal.id;
                let prior = self.withdrawals.insert(id, withdrawal);
                undo.push(Undo::Withdrawal(id, prior));
            }
            LedgerWrite::InsertBonus(bonus) => {
                let id = bonus.id;
                let prior = self.bonuses.insert(id, bonus);
                undo.push(Undo::Bonus(id, prior));
            }
            LedgerWrite::LinkPaymentTransaction {
                payment,
                transaction,
            } => {
                if !self.transactions.contains_key(&transaction) {
                    return Err(missing(StaleEntity::Transaction, transaction));
                }
                let record = self
                    .payments
                    .get_mut(&payment)
                    .ok_or_else(|| missing(StaleEntity::CryptoPayment, payment))?;
                undo.push(Undo::Payment(payment, Some(record.clone())));
                record.transaction_id = Some(transaction);
            }
            LedgerWrite::LinkWithdrawalTransaction {
                withdrawal,
                transaction,
            } => {
                if !self.transactions.contains_key(&transaction) {
                    return Err(missing(StaleEntity::Transaction, transaction));
                }
                let record = self
                    .withdrawals
                    .get_mut(&withdrawal)
                    .ok_or_else(|| missing(StaleEntity::Withdrawal, withdrawal))?;
                undo.push(Undo::Withdrawal(withdrawal, Some(record.clone())));
                record.transaction_id = Some(transaction);
            }
            LedgerWrite::SetPaymentStatus { payment, status } => {
                let record = self
                    .payments
                    .get_mut(&payment)
                    .ok_or_else(|| missing(StaleEntity::CryptoPayment, payment))?;
                let current = record.status;
                let next = current
                    .advance_to(status)
                    .ok_or_else(|| PayledgerError::StaleWrite {
                        entity: StaleEntity::CryptoPayment,
                        id: payment.to_string(),
                        reason: format!("cannot move {current} -> {status}"),
                    })?;
                undo.push(Undo::Payment(payment, Some(record.clone())));
                record.status = next;
            }
            LedgerWrite::MarkWithdrawalProcessing {
                withdrawal,
                payout_id,
            } => {
                let record = self.withdrawal_in(withdrawal, WithdrawalStatus::Processing)?;
                undo.push(Undo::Withdrawal(withdrawal, Some(record.clone())));
                record.status = WithdrawalStatus::Processing;
                record.payout_id = Some(payout_id);
            }
            LedgerWrite::MarkWithdrawalFailed { withdrawal } => {
                let record = self.withdrawal_in(withdrawal, WithdrawalStatus::Failed)?;
                undo.push(Undo::Withdrawal(withdrawal, Some(record.clone())));
                record.status = WithdrawalStatus::Failed;
            }
            LedgerWrite::TransitionTransaction { transaction, to } => {
                let record = self
                    .transactions
                    .get_mut(&transaction)
                    .ok_or_else(|| missing(StaleEntity::Transaction, transaction))?;
                if !record.status.can_transition_to(to) {
                    return Err(PayledgerError::StaleWrite {
                        entity: StaleEntity::Transaction,
                        id: transaction.to_string(),
                        reason: format!("cannot move {} -> {to}", record.status),
                    });
                }
                undo.push(Undo::Transaction(transaction, Some(record.clone())));
                record.status = to;
            }
            LedgerWrite::ActivateBonus { bonus, activation } => {
                let record = self
                    .bonuses
                    .get_mut(&bonus)
                    .ok_or_else(|| missing(StaleEntity::Bonus, bonus))?;
                if record.status != BonusStatus::PendingActivation {
                    return Err(PayledgerError::StaleWrite {
                        entity: StaleEntity::Bonus,
                        id: bonus.to_string(),
                        reason: format!("bonus is {:?}", record.status),
                    });
                }
                undo.push(Undo::Bonus(bonus, Some(record.clone())));
                activation.apply(record);
            }
            LedgerWrite::RequireAvailable { user, amount } => {
                let balance = self.balance(user);
                if !balance.covers(amount) {
                    return Err(PayledgerError::InsufficientFunds {
                        needed: amount,
                        available: balance.available,
                    });
                }
            }
        }
        Ok(())
    }

    fn rollback(&mut self, undo: Vec<Undo>) {
        for entry in undo.into_iter().rev() {
            match entry {
                Undo::Transaction(id, prior) => restore(&mut self.transactions, id, prior),
                Undo::UserIndex(user) => {
                    if let Some(ids) = self.user_transactions.get_mut(&user) {
                        ids.pop();
                        if ids.is_empty() {
                            self.user_transactions.remove(&user);
                        }
                    }
                }
                Undo::Payment(id, prior) => restore(&mut self.payments, id, prior),
                Undo::ExternalIndex(external) => {
                    self.payments_by_external.remove(&external);
                }
                Undo::Withdrawal(id, prior) => restore(&mut self.withdrawals, id, prior),
                Undo::Bonus(id, prior) => restore(&mut self.bonuses, id, prior),
            }
        }
    }

    fn withdrawal_in(
        &mut self,
        id: WithdrawalId,
        next: WithdrawalStatus,
    ) -> Result<&mut WithdrawalRequest> {
        let record = self
            .withdrawals
            .get_mut(&id)
            .ok_or_else(|| missing(StaleEntity::Withdrawal, id))?;
        if !record.status.can_transition_to(next) {
            return Err(PayledgerError::StaleWrite {
                entity: StaleEntity::Withdrawal,
                id: id.to_string(),
                reason: format!("cannot move {} -> {next}", record.status),
            });
        }
        Ok(record)
    }

    fn user_history(&self, user: UserId) -> Vec<Transaction> {
        self.user_transactions
            .get(&user)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.transactions.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn balance(&self, user: UserId) -> BalanceSnapshot {
        let ids = self.user_transactions.get(&user);
        BalanceSnapshot::from_transactions(
            ids.into_iter()
                .flatten()
                .filter_map(|id| self.transactions.get(id)),
        )
    }
}

/// Ledger held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
    commits: AtomicU64,
}

impl InMemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of units committed successfully so far.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn commit(&self, unit: UnitOfWork) -> Result<()> {
        let mut state = self.state.write().await;
        let label = unit.label;
        let writes = unit.len();
        let mut undo = Vec::with_capacity(writes);
        for write in unit.writes {
            if let Err(err) = state.apply(write, &mut undo) {
                state.rollback(undo);
                tracing::debug!(unit = label, writes, error = %err, "Unit of work rejected");
                return Err(err);
            }
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(unit = label, writes, "Unit of work committed");
        Ok(())
    }

    async fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        Ok(self.state.read().await.transactions.get(&id).cloned())
    }

    async fn transactions_for_user(&self, user: UserId) -> Result<Vec<Transaction>> {
        Ok(self.state.read().await.user_history(user))
    }

    async fn crypto_payment_by_external_id(
        &self,
        payment_id: &ExternalPaymentId,
    ) -> Result<Option<CryptoPayment>> {
        let state = self.state.read().await;
        Ok(state
            .payments_by_external
            .get(payment_id)
            .and_then(|id| state.payments.get(id))
            .cloned())
    }

    async fn withdrawal(&self, id: WithdrawalId) -> Result<Option<WithdrawalRequest>> {
        Ok(self.state.read().await.withdrawals.get(&id).cloned())
    }

    async fn pending_deposit_bonuses(&self, user: UserId) -> Result<Vec<Bonus>> {
        let state = self.state.read().await;
        let mut bonuses: Vec<Bonus> = state
            .bonuses
            .values()
            .filter(|b| b.user_id == user && b.awaits_deposit())
            .cloned()
            .collect();
        bonuses.sort_by_key(|b| b.id);
        Ok(bonuses)
    }

    async fn bonuses_for_user(&self, user: UserId) -> Result<Vec<Bonus>> {
        let state = self.state.read().await;
        let mut bonuses: Vec<Bonus> = state
            .bonuses
            .values()
            .filter(|b| b.user_id == user)
            .cloned()
            .collect();
        bonuses.sort_by_key(|b| b.id);
        Ok(bonuses)
    }
}
