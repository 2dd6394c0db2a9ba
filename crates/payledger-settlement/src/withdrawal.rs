//! Crypto withdrawal initiation.
//!
//! The pending withdrawal and its pending ledger entry are committed before
//! the payout call, so the amount is reserved while the payout is in flight.
//! A rejected payout marks both records failed in one unit, releasing the
//! reservation.

use chrono::Utc;
use payledger_gateway::PayoutInstruction;
use payledger_ledger::{LedgerWrite, UnitOfWork};
use payledger_types::constants::ADDRESS_PREVIEW_CHARS;
use payledger_types::{
    PayledgerError, Result, Transaction, TransactionStatus, TransactionType, UserId,
    WithdrawalId, WithdrawalRequest, WithdrawalStatus,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::validate_amount;
use crate::SettlementEngine;

/// Withdrawal request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateWithdrawal {
    pub amount_in_base_currency: Decimal,
    pub currency: String,
    pub address: String,
}

/// Outcome of an accepted payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalReceipt {
    pub success: bool,
    pub withdrawal_id: WithdrawalId,
    pub payout_id: String,
    pub amount_in_base_currency: Decimal,
    pub crypto_amount: Decimal,
}

impl SettlementEngine {
    pub async fn initiate_withdrawal(
        &self,
        user: UserId,
        request: &InitiateWithdrawal,
    ) -> Result<WithdrawalReceipt> {
        let amount = request.amount_in_base_currency;
        validate_amount(amount, self.config.min_withdrawal, None)?;
        let currency = self.validate_currency(&request.currency)?;
        let address = request.address.trim();
        if address.is_empty() {
            return Err(PayledgerError::invalid("address is required"));
        }

        // Money leaving the platform: check against the ledger, not the cache.
        let balance = self.cache.authoritative_balance(user).await?;
        if !balance.covers(amount) {
            tracing::warn!(
                user = %user.short(),
                %amount,
                available = %balance.available,
                "Withdrawal rejected: insufficient funds"
            );
            return Err(PayledgerError::InsufficientFunds {
                needed: amount,
                available: balance.available,
            });
        }

        let priced = self
            .convert(amount, &self.config.base_currency, &self.config.pricing_currency)
            .await?;
        let crypto_amount = self
            .convert(priced, &self.config.pricing_currency, &currency)
            .await?;

        let preview: String = address.chars().take(ADDRESS_PREVIEW_CHARS).collect();
        let transaction = Transaction::pending(
            user,
            TransactionType::Withdrawal,
            amount,
            format!("Withdrawal request to {currency} address {preview}..."),
        );
        let withdrawal = WithdrawalRequest {
            id: WithdrawalId::new(),
            user_id: user,
            amount,
            currency: currency.clone(),
            address: address.to_string(),
            crypto_amount,
            base_amount: amount,
            base_currency: self.config.base_currency.to_uppercase(),
            status: WithdrawalStatus::Pending,
            payout_id: None,
            transaction_id: None,
            created_at: Utc::now(),
        };
        let (withdrawal_id, transaction_id) = (withdrawal.id, transaction.id);

        self.ledger
            .commit(
                UnitOfWork::new("withdrawal.create")
                    .push(LedgerWrite::RequireAvailable { user, amount })
                    .push(LedgerWrite::InsertWithdrawal(withdrawal))
                    .push(LedgerWrite::InsertTransaction(transaction))
                    .push(LedgerWrite::LinkWithdrawalTransaction {
                        withdrawal: withdrawal_id,
                        transaction: transaction_id,
                    }),
            )
            .await?;
        self.cache.invalidate_cache(user).await;

        let payout = self
            .gateway
            .create_mass_payout(&[PayoutInstruction {
                address: address.to_string(),
                currency: currency.clone(),
                amount: crypto_amount,
            }])
            .await;

        match payout {
            Ok(payout) => {
                let recorded = self
                    .ledger
                    .commit(UnitOfWork::new("withdrawal.processing").push(
                        LedgerWrite::MarkWithdrawalProcessing {
                            withdrawal: withdrawal_id,
                            payout_id: payout.id.clone(),
                        },
                    ))
                    .await;
                self.cache.invalidate_cache(user).await;
                if let Err(err) = recorded {
                    // The provider holds the payout; the reservation stays in
                    // place until it is reconciled by hand.
                    tracing::error!(
                        user = %user.short(),
                        withdrawal = %withdrawal_id,
                        payout_id = %payout.id,
                        %amount,
                        %crypto_amount,
                        %currency,
                        error = %err,
                        "Payout accepted but not recorded; reconcile manually"
                    );
                    return Err(err);
                }

                tracing::info!(
                    user = %user.short(),
                    withdrawal = %withdrawal_id.short(),
                    payout_id = %payout.id,
                    %amount,
                    %crypto_amount,
                    %currency,
                    "Withdrawal payout submitted"
                );
                Ok(WithdrawalReceipt {
                    success: true,
                    withdrawal_id,
                    payout_id: payout.id,
                    amount_in_base_currency: amount,
                    crypto_amount,
                })
            }
            Err(err) => {
                tracing::error!(
                    user = %user.short(),
                    withdrawal = %withdrawal_id.short(),
                    error = %err,
                    "Payout failed; releasing reserved funds"
                );
                self.ledger
                    .commit(
                        UnitOfWork::new("withdrawal.payout_failed")
                            .push(LedgerWrite::MarkWithdrawalFailed {
                                withdrawal: withdrawal_id,
                            })
                            .push(LedgerWrite::TransitionTransaction {
                                transaction: transaction_id,
                                to: TransactionStatus::Fail,
                            }),
                    )
                    .await?;
                self.cache.invalidate_cache(user).await;

                Err(PayledgerError::PayoutFailed {
                    withdrawal_id,
                    reason: err.to_string(),
                })
            }
        }
    }
}
