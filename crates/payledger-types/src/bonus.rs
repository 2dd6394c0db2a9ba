//! Promotional bonus model and the deposit-bonus arithmetic.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{BonusId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BonusType {
    DepositBonus,
    NoDepositBonus,
    Combined,
}

impl BonusType {
    /// Whether a finished deposit can activate this kind of bonus.
    #[must_use]
    pub fn activates_on_deposit(self) -> bool {
        matches!(self, Self::DepositBonus | Self::Combined)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BonusStatus {
    PendingActivation,
    PendingWagering,
    Completed,
    Expired,
    Cancelled,
}

/// Terms of the promo code a bonus was claimed with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    pub code: String,
    /// Smallest deposit (base currency) that activates the bonus. `None` = any.
    pub min_deposit_amount: Option<Decimal>,
    pub bonus_percentage: Decimal,
    /// Cap on the credited amount. `None` or non-positive = uncapped.
    pub max_bonus_amount: Option<Decimal>,
}

impl PromoCode {
    /// Bonus credited for `deposit`, or `None` if the deposit is below the
    /// promo's minimum.
    ///
    /// An uncomputable percentage yields the cap when there is one and
    /// `None` otherwise.
    #[must_use]
    pub fn bonus_for(&self, deposit: Decimal) -> Option<Decimal> {
        let min = self.min_deposit_amount.unwrap_or(Decimal::ZERO);
        if deposit < min {
            return None;
        }
        let cap = self.max_bonus_amount.filter(|cap| *cap > Decimal::ZERO);
        let raw = deposit
            .checked_mul(self.bonus_percentage)
            .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED));
        match (raw, cap) {
            (Some(raw), Some(cap)) if raw > cap => Some(cap),
            (Some(raw), _) => Some(raw),
            (None, cap) => cap,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Bonus {
    pub id: BonusId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub bonus_type: BonusType,
    pub status: BonusStatus,
    /// Deposit amount that activated the bonus.
    pub amount: Decimal,
    pub bonus_amount: Decimal,
    /// Wagering still required before the bonus converts.
    pub remaining_amount: Decimal,
    pub promo_code: Option<PromoCode>,
    pub activated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Bonus {
    /// A freshly claimed bonus waiting for a qualifying deposit.
    #[must_use]
    pub fn claimed(user_id: UserId, bonus_type: BonusType, promo_code: Option<PromoCode>) -> Self {
        Self {
            id: BonusId::new(),
            user_id,
            bonus_type,
            status: BonusStatus::PendingActivation,
            amount: Decimal::ZERO,
            bonus_amount: Decimal::ZERO,
            remaining_amount: Decimal::ZERO,
            promo_code,
            activated_at: None,
            created_at: Utc::now(),
        }
    }

    /// Whether a finished deposit should be offered to this bonus.
    #[must_use]
    pub fn awaits_deposit(&self) -> bool {
        self.bonus_type.activates_on_deposit() && self.status == BonusStatus::PendingActivation
    }

    /// The activation a deposit of `deposit` would apply, if it qualifies.
    /// A bonus without promo terms activates with a zero credit.
    #[must_use]
    pub fn plan_activation(&self, deposit: Decimal, now: DateTime<Utc>) -> Option<BonusActivation> {
        let bonus_amount = match &self.promo_code {
            Some(promo) => promo.bonus_for(deposit)?,
            None => Decimal::ZERO,
        };
        Some(BonusActivation {
            deposit_amount: deposit,
            bonus_amount,
            activated_at: now,
        })
    }

    /// Human-readable source of the credit.
    #[must_use]
    pub fn credit_description(&self) -> String {
        let source = self
            .promo_code
            .as_ref()
            .map_or("promo code", |promo| promo.code.as_str());
        format!("Bonus credit from {source}")
    }
}

/// Values written to a bonus when a deposit activates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusActivation {
    pub deposit_amount: Decimal,
    pub bonus_amount: Decimal,
    pub activated_at: DateTime<Utc>,
}

impl BonusActivation {
    /// Apply to `bonus`: status moves to wagering and the amounts are set.
    pub fn apply(&self, bonus: &mut Bonus) {
        bonus.status = BonusStatus::PendingWagering;
        bonus.amount = self.deposit_amount;
        bonus.bonus_amount = self.bonus_amount;
        bonus.remaining_amount = self.bonus_amount;
        bonus.activated_at = Some(self.activated_at);
    }
}
