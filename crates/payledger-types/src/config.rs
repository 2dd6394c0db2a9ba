//! Configuration types for the settlement engine and its collaborators.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants;

/// Limits and currencies the settlement engine enforces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Ledger accounting currency (e.g., "inr").
    pub base_currency: String,
    /// Currency provider invoices are priced in (e.g., "usd").
    pub pricing_currency: String,
    pub min_deposit: Option<Decimal>,
    pub max_deposit: Option<Decimal>,
    pub min_withdrawal: Option<Decimal>,
    /// Accepted pay/payout currencies. Empty accepts any.
    pub supported_currencies: Vec<String>,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            base_currency: constants::BASE_CURRENCY.to_string(),
            pricing_currency: constants::PRICING_CURRENCY.to_string(),
            min_deposit: Some(Decimal::new(constants::DEFAULT_MIN_DEPOSIT, 0)),
            max_deposit: Some(Decimal::new(constants::DEFAULT_MAX_DEPOSIT, 0)),
            min_withdrawal: Some(Decimal::new(constants::DEFAULT_MIN_WITHDRAWAL, 0)),
            supported_currencies: constants::DEFAULT_SUPPORTED_CURRENCIES
                .iter()
                .map(|c| (*c).to_string())
                .collect(),
        }
    }
}

impl SettlementConfig {
    /// No amount limits, any currency.
    #[must_use]
    pub fn unrestricted() -> Self {
        Self {
            min_deposit: None,
            max_deposit: None,
            min_withdrawal: None,
            supported_currencies: Vec::new(),
            ..Self::default()
        }
    }

    /// Whether `currency` (any casing) may be used for a payment or payout.
    #[must_use]
    pub fn supports_currency(&self, currency: &str) -> bool {
        self.supported_currencies.is_empty()
            || self
                .supported_currencies
                .iter()
                .any(|c| c.eq_ignore_ascii_case(currency))
    }
}

/// Rate converter cache and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateConfig {
    pub cache_ttl_secs: u64,
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: constants::RATE_CACHE_TTL_SECS,
            max_attempts: constants::RATE_MAX_ATTEMPTS,
            base_backoff_ms: constants::RATE_BASE_BACKOFF_MS,
        }
    }
}

impl RateConfig {
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Sleep before query number `attempt` (1-based). Zero for the first.
    #[must_use]
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 1u64.checked_shl(attempt - 2).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_backoff_ms.saturating_mul(factor))
    }
}

/// Connection settings for the crypto payment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: String,
    /// Account credentials for the payout auth endpoint.
    pub email: String,
    pub password: String,
    /// Shared secret for webhook HMACs.
    pub ipn_secret: String,
    /// Where the provider should deliver payment notifications.
    pub ipn_callback_url: Option<String>,
    pub timeout_ms: u64,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>, ipn_secret: impl Into<String>) -> Self {
        Self {
            base_url: constants::DEFAULT_GATEWAY_BASE_URL.to_string(),
            api_key: api_key.into(),
            email: String::new(),
            password: String::new(),
            ipn_secret: ipn_secret.into(),
            ipn_callback_url: None,
            timeout_ms: constants::DEFAULT_GATEWAY_TIMEOUT_MS,
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
