//! Currency conversion with a per-pair TTL cache.
//!
//! Quotes come from an external [`PriceSource`] that rate-limits aggressively.
//! A cache hit scales the stored unit rate by the requested amount; a miss
//! queries the source, retrying with exponential backoff while it reports a
//! rate limit. Any other failure is final.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use payledger_types::{PayledgerError, RateConfig, Result};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::GatewayClientError;

/// Why a price query failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("price source rate limit exceeded")]
    RateLimited,
    #[error("price query failed: {0}")]
    Failed(String),
}

impl From<GatewayClientError> for PriceError {
    fn from(err: GatewayClientError) -> Self {
        match err {
            GatewayClientError::RateLimited => Self::RateLimited,
            other => Self::Failed(other.to_string()),
        }
    }
}

/// External quote provider.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// How much `to` one gets for `amount` of `from`.
    async fn estimate(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
    ) -> std::result::Result<Decimal, PriceError>;
}

#[derive(Debug, Clone, Copy)]
struct CachedRate {
    unit_rate: Decimal,
    fetched_at: Instant,
}

/// Cached converter shared by every request in the process.
pub struct RateConverter {
    source: Arc<dyn PriceSource>,
    config: RateConfig,
    /// Keyed by lowercased `(from, to)`.
    cache: Mutex<HashMap<(String, String), CachedRate>>,
}

impl RateConverter {
    #[must_use]
    pub fn new(source: Arc<dyn PriceSource>, config: RateConfig) -> Self {
        Self {
            source,
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Convert `amount` of `from` into `to`.
    pub async fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal> {
        let from = from.trim().to_lowercase();
        let to = to.trim().to_lowercase();
        if amount.is_zero() || from == to {
            return Ok(amount);
        }
        let key = (from, to);

        if let Some(rate) = self.cached(&key).await {
            tracing::debug!(from = %key.0, to = %key.1, %amount, "Rate cache hit");
            return amount
                .checked_mul(rate)
                .ok_or_else(|| conversion_failed(&key, 0, "amount overflow"));
        }

        let estimate = self.query(&key, amount).await?;
        let unit_rate = estimate
            .checked_div(amount)
            .ok_or_else(|| conversion_failed(&key, 1, "rate overflow"))?;
        self.cache.lock().await.insert(
            key,
            CachedRate {
                unit_rate,
                fetched_at: Instant::now(),
            },
        );
        Ok(estimate)
    }

    /// Base currency amount in the pricing currency (INR → USD).
    pub async fn inr_to_usd(&self, inr_amount: Decimal) -> Result<Decimal> {
        self.convert(inr_amount, "inr", "usd").await
    }

    /// Pricing currency amount in a crypto asset (USD → `crypto`).
    pub async fn usd_to_crypto(&self, usd_amount: Decimal, crypto: &str) -> Result<Decimal> {
        self.convert(usd_amount, "usd", crypto).await
    }

    async fn cached(&self, key: &(String, String)) -> Option<Decimal> {
        let cache = self.cache.lock().await;
        let entry = cache.get(key)?;
        (entry.fetched_at.elapsed() < self.config.cache_ttl()).then_some(entry.unit_rate)
    }

    async fn query(&self, key: &(String, String), amount: Decimal) -> Result<Decimal> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let delay = self.config.backoff_before(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match self.source.estimate(amount, &key.0, &key.1).await {
                // A non-positive quote for a positive amount would price the
                // pair at zero for the whole TTL.
                Ok(estimate) if amount > Decimal::ZERO && estimate <= Decimal::ZERO => {
                    tracing::error!(from = %key.0, to = %key.1, %amount, %estimate, "Price source returned a non-positive estimate");
                    return Err(conversion_failed(key, attempt, "non-positive estimate"));
                }
                Ok(estimate) => return Ok(estimate),
                Err(PriceError::RateLimited) if attempt < max_attempts => {
                    tracing::warn!(
                        from = %key.0,
                        to = %key.1,
                        attempt,
                        max_attempts,
                        "Price source rate limited; backing off"
                    );
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(from = %key.0, to = %key.1, attempt, error = %err, "Currency conversion failed");
                    return Err(conversion_failed(key, attempt, &err.to_string()));
                }
            }
        }
    }
}

fn conversion_failed(key: &(String, String), attempts: u32, reason: &str) -> PayledgerError {
    PayledgerError::ConversionFailed {
        from: key.0.clone(),
        to: key.1.clone(),
        attempts,
        reason: reason.to_string(),
    }
}
