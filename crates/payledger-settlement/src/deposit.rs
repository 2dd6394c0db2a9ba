//! Crypto deposit initiation.
//!
//! 1. Validate amount bounds and the pay currency
//! 2. Convert the base amount into the provider's pricing currency
//! 3. Open a payment with the provider
//! 4. Commit payment + pending ledger entry + back-reference as one unit
//! 5. Invalidate the user's cached balance
//!
//! Nothing is written unless the provider accepted the payment.

use chrono::{DateTime, Utc};
use payledger_gateway::CreatePayment;
use payledger_ledger::{LedgerWrite, UnitOfWork};
use payledger_types::{
    CryptoPayment, CryptoPaymentId, CryptoPaymentStatus, ExternalPaymentId, PayledgerError,
    Result, Transaction, TransactionType, UserId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::validate_amount;
use crate::SettlementEngine;

/// Deposit request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateDeposit {
    pub amount_in_base_currency: Decimal,
    pub pay_currency: String,
}

/// Where and how much the user has to pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositDetails {
    pub payment_id: ExternalPaymentId,
    pub address: String,
    pub qr_code: Option<String>,
    /// Amount of `currency` to send.
    pub amount: Decimal,
    pub currency: String,
    pub amount_in_base_currency: Decimal,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SettlementEngine {
    pub async fn initiate_deposit(
        &self,
        user: UserId,
        request: &InitiateDeposit,
    ) -> Result<DepositDetails> {
        let amount = request.amount_in_base_currency;
        validate_amount(amount, self.config.min_deposit, self.config.max_deposit)?;
        let pay_currency = self.validate_currency(&request.pay_currency)?;

        let price_amount = self
            .convert(amount, &self.config.base_currency, &self.config.pricing_currency)
            .await?;

        let now = Utc::now();
        let order_id = format!("deposit_{user}_{}", now.timestamp_millis());
        let created = self
            .gateway
            .create_payment(&CreatePayment {
                price_amount,
                price_currency: self.config.pricing_currency.clone(),
                pay_currency,
                order_id: order_id.clone(),
                order_description: Some(format!("Deposit for user {user}")),
            })
            .await
            .map_err(|err| {
                tracing::error!(user = %user.short(), %order_id, error = %err, "Payment creation failed");
                PayledgerError::from(err)
            })?;

        let transaction = Transaction::pending(
            user,
            TransactionType::Deposit,
            amount,
            format!(
                "Pending crypto deposit via {}",
                created.pay_currency.to_uppercase()
            ),
        );
        let payment = CryptoPayment {
            id: CryptoPaymentId::new(),
            user_id: user,
            payment_id: created.payment_id.clone(),
            order_id,
            pay_address: created.pay_address.clone(),
            pay_currency: created.pay_currency.clone(),
            pay_amount: created.pay_amount,
            price_amount: created.price_amount,
            price_currency: created.price_currency.clone(),
            base_amount: amount,
            base_currency: self.config.base_currency.to_uppercase(),
            status: CryptoPaymentStatus::Pending,
            expires_at: created.expiration_estimate_date,
            transaction_id: None,
            created_at: now,
        };
        let (payment_ref, transaction_ref) = (payment.id, transaction.id);

        self.ledger
            .commit(
                UnitOfWork::new("deposit.create")
                    .push(LedgerWrite::InsertCryptoPayment(payment))
                    .push(LedgerWrite::InsertTransaction(transaction))
                    .push(LedgerWrite::LinkPaymentTransaction {
                        payment: payment_ref,
                        transaction: transaction_ref,
                    }),
            )
            .await?;
        self.cache.invalidate_cache(user).await;

        tracing::info!(
            user = %user.short(),
            payment_id = %created.payment_id,
            tx = %transaction_ref.short(),
            %amount,
            pay_currency = %created.pay_currency,
            "Crypto deposit created"
        );

        Ok(DepositDetails {
            payment_id: created.payment_id,
            address: created.pay_address,
            qr_code: created.qr_code,
            amount: created.pay_amount,
            currency: created.pay_currency,
            amount_in_base_currency: amount,
            expires_at: created.expiration_estimate_date,
        })
    }
}
