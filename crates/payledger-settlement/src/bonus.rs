//! Deposit bonus activation.
//!
//! When a deposit settles, every deposit-activated bonus of the user that is
//! still waiting moves to wagering, provided the deposit meets its promo's
//! minimum. Each activation with a positive amount also credits a settled
//! bonus entry to the ledger. The writes are returned so the caller can commit
//! them in the same unit as the deposit's own transition.

use chrono::{DateTime, Utc};
use payledger_ledger::LedgerWrite;
use payledger_types::{Bonus, Transaction};
use rust_decimal::Decimal;

/// Writes activating bonuses for one settled deposit.
#[derive(Debug, Default)]
pub struct BonusPlan {
    pub writes: Vec<LedgerWrite>,
    pub activated: usize,
    /// Sum of bonus credits added to the ledger.
    pub credited: Decimal,
}

/// Plan activations of `bonuses` for a settled deposit of `deposit`.
pub fn plan_deposit_bonuses(bonuses: &[Bonus], deposit: Decimal, now: DateTime<Utc>) -> BonusPlan {
    let mut plan = BonusPlan::default();

    for bonus in bonuses.iter().filter(|b| b.awaits_deposit()) {
        let Some(activation) = bonus.plan_activation(deposit, now) else {
            tracing::debug!(
                bonus = %bonus.id.short(),
                %deposit,
                "Deposit below promo minimum; bonus stays pending"
            );
            continue;
        };

        let credit = activation.bonus_amount;
        plan.writes.push(LedgerWrite::ActivateBonus {
            bonus: bonus.id,
            activation,
        });
        if credit > Decimal::ZERO {
            plan.writes.push(LedgerWrite::InsertTransaction(Transaction::bonus_credit(
                bonus.user_id,
                credit,
                bonus.credit_description(),
            )));
            plan.credited += credit;
        }
        plan.activated += 1;
    }

    plan
}
