//! The settlement engine and its read operations.
//!
//! Write flows live in sibling modules (`deposit`, `withdrawal`, `webhook`)
//! as further `impl SettlementEngine` blocks.

use std::sync::Arc;

use payledger_gateway::{IpnVerifier, PaymentGateway, RateConverter};
use payledger_ledger::{BalanceCache, LedgerStore};
use payledger_types::{
    BalanceSnapshot, PayledgerError, Result, SettlementConfig, Transaction, TransactionCategory,
    UserId,
};
use rust_decimal::Decimal;

/// Orchestrates deposits, withdrawals, and provider notifications against the
/// ledger.
///
/// Every flow commits its ledger writes as one unit of work and invalidates
/// the user's cached balance after each commit.
pub struct SettlementEngine {
    pub(crate) ledger: Arc<dyn LedgerStore>,
    pub(crate) cache: Arc<dyn BalanceCache>,
    pub(crate) rates: Arc<RateConverter>,
    pub(crate) gateway: Arc<dyn PaymentGateway>,
    pub(crate) verifier: IpnVerifier,
    pub(crate) config: SettlementConfig,
}

impl SettlementEngine {
    #[must_use]
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        cache: Arc<dyn BalanceCache>,
        rates: Arc<RateConverter>,
        gateway: Arc<dyn PaymentGateway>,
        verifier: IpnVerifier,
        config: SettlementConfig,
    ) -> Self {
        Self {
            ledger,
            cache,
            rates,
            gateway,
            verifier,
            config,
        }
    }

    /// The user's balance, served from the balance cache.
    pub async fn balance(&self, user: UserId) -> Result<BalanceSnapshot> {
        self.cache.get_balance(user).await
    }

    /// The user's ledger entries, newest first, optionally limited to one
    /// category.
    pub async fn transaction_history(
        &self,
        user: UserId,
        category: Option<TransactionCategory>,
    ) -> Result<Vec<Transaction>> {
        let mut history = self.ledger.transactions_for_user(user).await?;
        if let Some(category) = category {
            history.retain(|tx| tx.category == category);
        }
        history.reverse();
        Ok(history)
    }

    /// Convert through the rate converter. Conversion failures reach callers
    /// as gateway errors.
    pub(crate) async fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal> {
        self.rates
            .convert(amount, from, to)
            .await
            .map_err(|err| match err {
                PayledgerError::ConversionFailed { .. } => PayledgerError::Gateway {
                    reason: err.to_string(),
                },
                other => other,
            })
    }

    /// Lowercased currency code, rejected when blank or unsupported.
    pub(crate) fn validate_currency(&self, currency: &str) -> Result<String> {
        let currency = currency.trim().to_lowercase();
        if currency.is_empty() {
            return Err(PayledgerError::invalid("currency is required"));
        }
        if !self.config.supports_currency(&currency) {
            return Err(PayledgerError::invalid(format!(
                "currency {currency} is not supported"
            )));
        }
        Ok(currency)
    }
}

/// Positive and within the configured bounds.
pub(crate) fn validate_amount(
    amount: Decimal,
    min: Option<Decimal>,
    max: Option<Decimal>,
) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(PayledgerError::invalid("amount must be positive"));
    }
    if let Some(min) = min.filter(|min| amount < *min) {
        return Err(PayledgerError::invalid(format!(
            "amount {amount} is below the minimum of {min}"
        )));
    }
    if let Some(max) = max.filter(|max| amount > *max) {
        return Err(PayledgerError::invalid(format!(
            "amount {amount} exceeds the maximum of {max}"
        )));
    }
    Ok(())
}
