//! # payledger-types
//!
//! Shared records, errors, and configuration for the **payledger** settlement
//! workspace.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`UserId`], [`TransactionId`], [`CryptoPaymentId`], [`WithdrawalId`], [`BonusId`], [`ExternalPaymentId`]
//! - **Ledger model**: [`Transaction`], [`TransactionType`], [`TransactionStatus`], [`TransactionCategory`]
//! - **Deposit model**: [`CryptoPayment`], [`CryptoPaymentStatus`], [`ProviderStatus`]
//! - **Withdrawal model**: [`WithdrawalRequest`], [`WithdrawalStatus`]
//! - **Bonus model**: [`Bonus`], [`BonusType`], [`BonusStatus`], [`PromoCode`]
//! - **Balance model**: [`BalanceSnapshot`]
//! - **Configuration**: [`SettlementConfig`], [`RateConfig`], [`GatewayConfig`]
//! - **Errors**: [`PayledgerError`] with `PL_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod balance;
pub mod bonus;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod payment;
pub mod transaction;
pub mod withdrawal;

// Re-export all primary types at crate root for ergonomic imports:
//   use payledger_types::{Transaction, CryptoPayment, BalanceSnapshot, ...};

pub use balance::*;
pub use bonus::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use payment::*;
pub use transaction::*;
pub use withdrawal::*;

// Constants are accessed via `payledger_types::constants::FOO`
// (not re-exported to avoid name collisions).
