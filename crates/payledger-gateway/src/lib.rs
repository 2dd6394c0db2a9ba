//! # payledger-gateway
//!
//! **Provider plane**: everything that talks to the external crypto payment
//! processor.
//!
//! ## Architecture
//!
//! 1. **PaymentGateway**: create deposit payments and mass payouts
//! 2. **PriceSource / RateConverter**: currency estimates with a TTL cache and
//!    exponential backoff on provider rate limits
//! 3. **IpnVerifier**: HMAC-SHA512 check of webhook bodies
//! 4. **NowPaymentsClient**: `reqwest` implementation of both provider traits
//!
//! ## Conversion Flow
//!
//! ```text
//! RateConverter::convert(amount, from, to)
//!   → cache hit?  amount × unit_rate
//!   → cache miss: PriceSource::estimate() ─429→ sleep(backoff) → retry
//!                 store estimate / amount for the pair
//! ```

pub mod client;
pub mod error;
pub mod ipn;
pub mod rates;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use client::{
    CreatePayment, NowPaymentsClient, PaymentCreated, PaymentGateway, PayoutCreated,
    PayoutInstruction,
};
pub use error::GatewayClientError;
pub use ipn::IpnVerifier;
pub use rates::{PriceError, PriceSource, RateConverter};
