//! Environment configuration for the server binary.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `PAYLEDGER_BIND_ADDR` | `0.0.0.0:8080` |
//! | `PAYLEDGER_LOG_JSON` | `false` |
//! | `PAYLEDGER_GATEWAY_URL` | provider API root |
//! | `PAYLEDGER_GATEWAY_API_KEY` | required |
//! | `PAYLEDGER_GATEWAY_EMAIL` / `PAYLEDGER_GATEWAY_PASSWORD` | empty (payouts fail auth) |
//! | `PAYLEDGER_GATEWAY_TIMEOUT_MS` | `15000` |
//! | `PAYLEDGER_IPN_SECRET` | required |
//! | `PAYLEDGER_IPN_CALLBACK_URL` | unset |
//! | `PAYLEDGER_BASE_CURRENCY` / `PAYLEDGER_PRICING_CURRENCY` | `inr` / `usd` |
//! | `PAYLEDGER_MIN_DEPOSIT` / `PAYLEDGER_MAX_DEPOSIT` / `PAYLEDGER_MIN_WITHDRAWAL` | `100` / `100000` / `100` |
//! | `PAYLEDGER_SUPPORTED_CURRENCIES` | comma separated, built-in list |
//! | `PAYLEDGER_RATE_CACHE_TTL_SECS` / `PAYLEDGER_RATE_MAX_ATTEMPTS` / `PAYLEDGER_RATE_BACKOFF_MS` | `300` / `3` / `1000` |

use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;

use payledger_types::constants::DEFAULT_API_PORT;
use payledger_types::{GatewayConfig, RateConfig, SettlementConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required {0}")]
    Missing(&'static str),
    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub log_json: bool,
    pub settlement: SettlementConfig,
    pub rates: RateConfig,
    pub gateway: GatewayConfig,
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|name| env::var(name).ok())
    }

    /// Build from any variable source; blank values count as unset.
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let bind_addr = parsed(lookup, "PAYLEDGER_BIND_ADDR")?
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], DEFAULT_API_PORT)));
        let log_json = flag(lookup, "PAYLEDGER_LOG_JSON")?;

        let defaults = SettlementConfig::default();
        let settlement = SettlementConfig {
            base_currency: var(lookup, "PAYLEDGER_BASE_CURRENCY")
                .map_or(defaults.base_currency, |c| c.to_lowercase()),
            pricing_currency: var(lookup, "PAYLEDGER_PRICING_CURRENCY")
                .map_or(defaults.pricing_currency, |c| c.to_lowercase()),
            min_deposit: parsed(lookup, "PAYLEDGER_MIN_DEPOSIT")?.or(defaults.min_deposit),
            max_deposit: parsed(lookup, "PAYLEDGER_MAX_DEPOSIT")?.or(defaults.max_deposit),
            min_withdrawal: parsed(lookup, "PAYLEDGER_MIN_WITHDRAWAL")?
                .or(defaults.min_withdrawal),
            supported_currencies: var(lookup, "PAYLEDGER_SUPPORTED_CURRENCIES").map_or(
                defaults.supported_currencies,
                |list| {
                    list.split(',')
                        .map(|c| c.trim().to_lowercase())
                        .filter(|c| !c.is_empty())
                        .collect()
                },
            ),
        };
        if let (Some(min), Some(max)) = (settlement.min_deposit, settlement.max_deposit) {
            if min > max {
                return Err(ConfigError::Invalid {
                    name: "PAYLEDGER_MIN_DEPOSIT",
                    reason: format!("{min} exceeds PAYLEDGER_MAX_DEPOSIT {max}"),
                });
            }
        }

        let rate_defaults = RateConfig::default();
        let rates = RateConfig {
            cache_ttl_secs: parsed(lookup, "PAYLEDGER_RATE_CACHE_TTL_SECS")?
                .unwrap_or(rate_defaults.cache_ttl_secs),
            max_attempts: parsed(lookup, "PAYLEDGER_RATE_MAX_ATTEMPTS")?
                .unwrap_or(rate_defaults.max_attempts),
            base_backoff_ms: parsed(lookup, "PAYLEDGER_RATE_BACKOFF_MS")?
                .unwrap_or(rate_defaults.base_backoff_ms),
        };
        if rates.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "PAYLEDGER_RATE_MAX_ATTEMPTS",
                reason: "must be at least 1".into(),
            });
        }

        let mut gateway = GatewayConfig::new(
            required(lookup, "PAYLEDGER_GATEWAY_API_KEY")?,
            required(lookup, "PAYLEDGER_IPN_SECRET")?,
        );
        if let Some(url) = var(lookup, "PAYLEDGER_GATEWAY_URL") {
            gateway.base_url = url;
        }
        gateway.email = var(lookup, "PAYLEDGER_GATEWAY_EMAIL").unwrap_or_default();
        gateway.password = var(lookup, "PAYLEDGER_GATEWAY_PASSWORD").unwrap_or_default();
        gateway.ipn_callback_url = var(lookup, "PAYLEDGER_IPN_CALLBACK_URL");
        if let Some(timeout_ms) = parsed(lookup, "PAYLEDGER_GATEWAY_TIMEOUT_MS")? {
            gateway.timeout_ms = timeout_ms;
        }

        Ok(Self {
            bind_addr,
            log_json,
            settlement,
            rates,
            gateway,
        })
    }
}

fn var(lookup: Lookup<'_>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(lookup: Lookup<'_>, name: &'static str) -> Result<String, ConfigError> {
    var(lookup, name).ok_or(ConfigError::Missing(name))
}

fn parsed<T>(lookup: Lookup<'_>, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    var(lookup, name)
        .map(|value| {
            value.parse().map_err(|err: T::Err| ConfigError::Invalid {
                name,
                reason: err.to_string(),
            })
        })
        .transpose()
}

fn flag(lookup: Lookup<'_>, name: &'static str) -> Result<bool, ConfigError> {
    match var(lookup, name).map(|v| v.to_lowercase()).as_deref() {
        None | Some("0" | "false" | "no" | "off") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some(other) => Err(ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got {other}"),
        }),
    }
}
