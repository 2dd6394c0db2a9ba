//! Deterministic provider stubs for tests.
//!
//! Enabled inside this crate's own tests and, for downstream crates, through
//! the `test-helpers` feature.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use payledger_types::ExternalPaymentId;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::client::{
    CreatePayment, PaymentCreated, PaymentGateway, PayoutCreated, PayoutInstruction,
};
use crate::rates::{PriceError, PriceSource};
use crate::GatewayClientError;

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Fixed-rate [`PriceSource`]. Pairs without a configured rate quote 1:1.
#[derive(Debug, Default)]
pub struct StubPriceSource {
    rates: HashMap<(String, String), Decimal>,
    calls: AtomicUsize,
    rate_limited: AtomicUsize,
    failures: AtomicUsize,
}

impl StubPriceSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Quote `rate` units of `to` per unit of `from`.
    #[must_use]
    pub fn with_rate(mut self, from: &str, to: &str, rate: Decimal) -> Self {
        self.rates
            .insert((from.to_lowercase(), to.to_lowercase()), rate);
        self
    }

    /// Answer the next `n` queries with a rate limit.
    pub fn rate_limit_next(&self, n: usize) {
        self.rate_limited.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` queries outright.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Number of queries received, including rejected ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for StubPriceSource {
    async fn estimate(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal, PriceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.rate_limited) {
            return Err(PriceError::RateLimited);
        }
        if take_one(&self.failures) {
            return Err(PriceError::Failed("stub price failure".into()));
        }
        let rate = self
            .rates
            .get(&(from.to_lowercase(), to.to_lowercase()))
            .copied()
            .unwrap_or(Decimal::ONE);
        Ok(amount * rate)
    }
}

/// In-process [`PaymentGateway`] that records every call.
#[derive(Debug)]
pub struct StubGateway {
    next_id: AtomicU64,
    fail_payments: AtomicBool,
    fail_payouts: AtomicBool,
    payments: Mutex<Vec<CreatePayment>>,
    payouts: Mutex<Vec<Vec<PayoutInstruction>>>,
}

impl Default for StubGateway {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(5_000_000_000),
            fail_payments: AtomicBool::new(false),
            fail_payouts: AtomicBool::new(false),
            payments: Mutex::new(Vec::new()),
            payouts: Mutex::new(Vec::new()),
        }
    }
}

impl StubGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_payments(&self, fail: bool) {
        self.fail_payments.store(fail, Ordering::SeqCst);
    }

    pub fn fail_payouts(&self, fail: bool) {
        self.fail_payouts.store(fail, Ordering::SeqCst);
    }

    /// Payment requests received, failed ones included.
    pub async fn payments(&self) -> Vec<CreatePayment> {
        self.payments.lock().await.clone()
    }

    /// Payout batches received, failed ones included.
    pub async fn payouts(&self) -> Vec<Vec<PayoutInstruction>> {
        self.payouts.lock().await.clone()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_payment(
        &self,
        request: &CreatePayment,
    ) -> Result<PaymentCreated, GatewayClientError> {
        self.payments.lock().await.push(request.clone());
        if self.fail_payments.load(Ordering::SeqCst) {
            return Err(GatewayClientError::Api {
                status: 500,
                message: "stub payment failure".into(),
            });
        }

        let id = self.next_id();
        let pay_currency = request.pay_currency.to_lowercase();
        let pay_address = format!("stub-{pay_currency}-{id}");
        Ok(PaymentCreated {
            payment_id: ExternalPaymentId::new(id.to_string()),
            qr_code: Some(format!("{pay_currency}:{pay_address}")),
            pay_address,
            pay_amount: request.price_amount,
            pay_currency,
            price_amount: request.price_amount,
            price_currency: request.price_currency.clone(),
            expiration_estimate_date: Some(Utc::now() + Duration::minutes(20)),
        })
    }

    async fn create_mass_payout(
        &self,
        withdrawals: &[PayoutInstruction],
    ) -> Result<PayoutCreated, GatewayClientError> {
        self.payouts.lock().await.push(withdrawals.to_vec());
        if self.fail_payouts.load(Ordering::SeqCst) {
            return Err(GatewayClientError::Api {
                status: 400,
                message: "stub payout failure".into(),
            });
        }
        Ok(PayoutCreated {
            id: format!("payout-{}", self.next_id()),
        })
    }
}
