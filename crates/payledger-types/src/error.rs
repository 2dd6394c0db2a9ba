//! Error types for payledger.
//!
//! All errors use the `PL_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Request / caller errors
//! - 2xx: Balance errors
//! - 3xx: Gateway and rate conversion errors
//! - 4xx: Webhook errors
//! - 5xx: Ledger store errors
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{ExternalPaymentId, WithdrawalId};

/// The kind of record a guarded ledger write found in an unexpected state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleEntity {
    Transaction,
    CryptoPayment,
    Withdrawal,
    Bonus,
}

impl std::fmt::Display for StaleEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transaction => write!(f, "transaction"),
            Self::CryptoPayment => write!(f, "crypto_payment"),
            Self::Withdrawal => write!(f, "withdrawal"),
            Self::Bonus => write!(f, "bonus"),
        }
    }
}

/// Central error enum for all payledger operations.
#[derive(Debug, Error)]
pub enum PayledgerError {
    // =================================================================
    // Request Errors (1xx)
    // =================================================================
    /// Malformed or missing input.
    #[error("PL_ERR_100: Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// No authenticated principal on the request.
    #[error("PL_ERR_101: Unauthorized")]
    Unauthorized,

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// Available balance does not cover the requested withdrawal.
    #[error("PL_ERR_200: Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    // =================================================================
    // Gateway / Conversion Errors (3xx)
    // =================================================================
    /// The payment provider call failed. No ledger writes were left behind.
    #[error("PL_ERR_300: Gateway error: {reason}")]
    Gateway { reason: String },

    /// The payout call failed after the withdrawal pair was created; the
    /// pair has been marked failed.
    #[error("PL_ERR_301: Payout failed for withdrawal {withdrawal_id}: {reason}")]
    PayoutFailed {
        withdrawal_id: WithdrawalId,
        reason: String,
    },

    /// The pricing provider kept rate-limiting or failed outright.
    #[error("PL_ERR_302: Currency conversion {from}->{to} failed after {attempts} attempt(s): {reason}")]
    ConversionFailed {
        from: String,
        to: String,
        attempts: u32,
        reason: String,
    },

    // =================================================================
    // Webhook Errors (4xx)
    // =================================================================
    /// Webhook HMAC did not match the body.
    #[error("PL_ERR_400: Invalid webhook signature")]
    InvalidSignature,

    /// Webhook referenced a payment id we never issued.
    #[error("PL_ERR_401: Payment not found: {0}")]
    PaymentNotFound(ExternalPaymentId),

    // =================================================================
    // Ledger Errors (5xx)
    // =================================================================
    /// A guarded write found its record already moved past the expected
    /// state. The whole unit of work was rejected.
    #[error("PL_ERR_500: Stale write on {entity} {id}: {reason}")]
    StaleWrite {
        entity: StaleEntity,
        id: String,
        reason: String,
    },

    /// Unique constraint on the provider payment id.
    #[error("PL_ERR_501: Duplicate payment id: {0}")]
    DuplicatePayment(ExternalPaymentId),

    /// A write referenced a record that does not exist.
    #[error("PL_ERR_502: Record not found: {entity} {id}")]
    RecordNotFound { entity: StaleEntity, id: String },

    /// Backing store failure. Raised by database-backed ledger stores; the
    /// in-memory ledger never fails this way.
    #[error("PL_ERR_503: Storage error: {0}")]
    Storage(String),

    // =================================================================
    // General (9xx)
    // =================================================================
    /// Configuration error (missing secret, invalid URL, etc.).
    #[error("PL_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl PayledgerError {
    /// Shorthand for [`PayledgerError::InvalidRequest`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// The `PL_ERR_nnn` code of this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "PL_ERR_100",
            Self::Unauthorized => "PL_ERR_101",
            Self::InsufficientFunds { .. } => "PL_ERR_200",
            Self::Gateway { .. } => "PL_ERR_300",
            Self::PayoutFailed { .. } => "PL_ERR_301",
            Self::ConversionFailed { .. } => "PL_ERR_302",
            Self::InvalidSignature => "PL_ERR_400",
            Self::PaymentNotFound(_) => "PL_ERR_401",
            Self::StaleWrite { .. } => "PL_ERR_500",
            Self::DuplicatePayment(_) => "PL_ERR_501",
            Self::RecordNotFound { .. } => "PL_ERR_502",
            Self::Storage(_) => "PL_ERR_503",
            Self::Configuration(_) => "PL_ERR_902",
        }
    }

    /// HTTP status the error surfaces as.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest { .. } | Self::InsufficientFunds { .. } => 400,
            Self::Unauthorized | Self::InvalidSignature => 401,
            Self::PaymentNotFound(_) => 404,
            _ => 500,
        }
    }

    /// Message safe to return to callers. Internal details stay in the logs.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "Invalid request",
            Self::Unauthorized => "Unauthorized",
            Self::InsufficientFunds { .. } => "Insufficient funds",
            Self::PayoutFailed { .. } => "Payout failed",
            Self::InvalidSignature => "Invalid signature",
            Self::PaymentNotFound(_) => "Payment not found",
            _ => "Internal error",
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, PayledgerError>;
