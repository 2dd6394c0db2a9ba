//! # payledger-server
//!
//! **HTTP surface**: axum routes over the [`SettlementEngine`], environment
//! configuration, and engine wiring for the binary.
//!
//! ## Routes
//!
//! | Method | Path | Auth |
//! |--------|------|------|
//! | POST | `/api/crypto/deposit` | `x-user-id` |
//! | POST | `/api/crypto/withdrawal` | `x-user-id` |
//! | POST | `/api/webhooks/nowpayments` | `x-nowpayments-sig` |
//! | GET | `/api/balance` | `x-user-id` |
//! | GET | `/api/transactions?category=` | `x-user-id` |
//! | GET | `/health` | none |

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;

use std::sync::Arc;

use payledger_gateway::{IpnVerifier, NowPaymentsClient, RateConverter};
use payledger_ledger::{InMemoryBalanceCache, InMemoryLedger, LedgerStore};
use payledger_settlement::SettlementEngine;
use payledger_types::PayledgerError;

pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
pub use routes::{AppState, build_router};

/// Wire the engine against the live provider and the in-memory ledger.
pub fn build_engine(config: &ServerConfig) -> Result<SettlementEngine, PayledgerError> {
    let ledger: Arc<dyn LedgerStore> = Arc::new(InMemoryLedger::new());
    let cache = Arc::new(InMemoryBalanceCache::new(ledger.clone()));
    let client = Arc::new(NowPaymentsClient::new(&config.gateway)?);
    let rates = Arc::new(RateConverter::new(client.clone(), config.rates.clone()));

    Ok(SettlementEngine::new(
        ledger,
        cache,
        rates,
        client,
        IpnVerifier::new(config.gateway.ipn_secret.clone()),
        config.settlement.clone(),
    ))
}
