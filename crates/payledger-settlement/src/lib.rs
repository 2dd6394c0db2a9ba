//! # payledger-settlement
//!
//! **Settlement plane**: turns deposit and withdrawal requests and the
//! provider's asynchronous notifications into ledger state.
//!
//! ## Architecture
//!
//! The [`SettlementEngine`] owns no state of its own. It is wired from:
//! 1. a [`LedgerStore`](payledger_ledger::LedgerStore) for all-or-nothing writes
//! 2. a [`BalanceCache`](payledger_ledger::BalanceCache) invalidated after every commit
//! 3. a [`RateConverter`](payledger_gateway::RateConverter) for base → pricing → crypto amounts
//! 4. a [`PaymentGateway`](payledger_gateway::PaymentGateway) for payments and payouts
//! 5. an [`IpnVerifier`](payledger_gateway::IpnVerifier) for webhook signatures
//!
//! ## Lifecycle
//!
//! ```text
//! deposit:    validate → convert → create_payment → commit{payment, pending tx, link}
//! webhook:    verify → advance payment → commit{status, tx success, bonus activations}
//! withdrawal: validate → authoritative balance → convert
//!             → commit{reserve, withdrawal, pending tx, link} → payout
//!             → ok:  commit{processing + payout id}
//!             → err: commit{withdrawal failed, tx fail} → PayoutFailed
//! ```

pub mod bonus;
pub mod deposit;
pub mod engine;
pub mod webhook;
pub mod withdrawal;

pub use bonus::{BonusPlan, plan_deposit_bonuses};
pub use deposit::{DepositDetails, InitiateDeposit};
pub use engine::SettlementEngine;
pub use webhook::WebhookOutcome;
pub use withdrawal::{InitiateWithdrawal, WithdrawalReceipt};
