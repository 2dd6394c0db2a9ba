//! Provider notification (IPN) reconciliation.
//!
//! ```text
//! verify HMAC ─✗→ InvalidSignature
//!   → parse {payment_id, payment_status} ─✗→ InvalidRequest
//!   → load payment ─✗→ PaymentNotFound
//!   → ProviderStatus::from_str ─✗→ acknowledged, no writes
//!   → plan: advance payment status
//!           + settle pending entry (finished → success + bonuses,
//!                                   failed/expired → fail)
//!   → commit ─StaleWrite→ re-plan from fresh state
//!   → invalidate balance cache
//! ```
//!
//! Deliveries are idempotent: the plan is derived from current state and every
//! write in it is guarded, so a repeated or concurrent notification that lost
//! the race re-plans to an empty unit.

use std::str::FromStr;

use chrono::Utc;
use payledger_ledger::{LedgerWrite, UnitOfWork};
use payledger_types::constants::MAX_FINALIZE_ATTEMPTS;
use payledger_types::{
    CryptoPayment, CryptoPaymentStatus, ExternalPaymentId, PayledgerError, ProviderStatus, Result,
    StaleEntity, TransactionId, TransactionStatus,
};
use serde::Deserialize;

use crate::bonus::plan_deposit_bonuses;
use crate::SettlementEngine;

#[derive(Debug, Deserialize)]
struct IpnPayload {
    payment_id: ExternalPaymentId,
    payment_status: String,
}

/// What a notification did to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Status string outside the provider vocabulary; nothing written.
    UnknownStatus(String),
    /// Duplicate or out-of-order notification; nothing written.
    Unchanged(CryptoPaymentStatus),
    /// Payment status moved forward; the ledger entry is still pending.
    Advanced(CryptoPaymentStatus),
    /// Deposit credited, with `bonuses_activated` bonuses in the same unit.
    Settled {
        transaction: TransactionId,
        bonuses_activated: usize,
    },
    /// Deposit failed or expired; its entry moved to fail.
    Voided { transaction: TransactionId },
}

struct Plan {
    unit: UnitOfWork,
    outcome: WebhookOutcome,
}

impl SettlementEngine {
    /// Authenticate and apply one provider notification.
    pub async fn handle_webhook(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome> {
        if let Err(err) = self.verifier.verify(raw_body, signature) {
            tracing::warn!(bytes = raw_body.len(), "Webhook signature rejected");
            return Err(err);
        }

        let payload: IpnPayload = serde_json::from_slice(raw_body)
            .map_err(|e| PayledgerError::invalid(format!("malformed notification: {e}")))?;

        let Some(mut payment) = self
            .ledger
            .crypto_payment_by_external_id(&payload.payment_id)
            .await?
        else {
            tracing::warn!(payment_id = %payload.payment_id, "Webhook for unknown payment");
            return Err(PayledgerError::PaymentNotFound(payload.payment_id));
        };

        let status = match ProviderStatus::from_str(&payload.payment_status) {
            Ok(status) => status,
            Err(unknown) => {
                tracing::warn!(
                    payment_id = %payload.payment_id,
                    status = %unknown.0,
                    current = %payment.status,
                    "Ignoring unrecognized provider status"
                );
                return Ok(WebhookOutcome::UnknownStatus(unknown.0));
            }
        };

        let mut attempt = 1;
        loop {
            let plan = self.plan(&payment, status).await?;
            if plan.unit.is_empty() {
                tracing::debug!(
                    payment_id = %payment.payment_id,
                    ?status,
                    current = %payment.status,
                    "Notification changes nothing"
                );
                return Ok(plan.outcome);
            }

            match self.ledger.commit(plan.unit).await {
                Ok(()) => {
                    self.cache.invalidate_cache(payment.user_id).await;
                    tracing::info!(
                        payment_id = %payment.payment_id,
                        user = %payment.user_id.short(),
                        ?status,
                        outcome = ?plan.outcome,
                        "Notification applied"
                    );
                    return Ok(plan.outcome);
                }
                Err(err @ PayledgerError::StaleWrite { .. }) if attempt < MAX_FINALIZE_ATTEMPTS => {
                    tracing::debug!(
                        payment_id = %payment.payment_id,
                        attempt,
                        error = %err,
                        "Concurrent update; re-planning notification"
                    );
                    attempt += 1;
                    payment = self
                        .ledger
                        .crypto_payment_by_external_id(&payment.payment_id)
                        .await?
                        .ok_or_else(|| PayledgerError::PaymentNotFound(payment.payment_id.clone()))?;
                }
                Err(err) => {
                    tracing::error!(
                        payment_id = %payment.payment_id,
                        attempt,
                        error = %err,
                        "Failed to apply notification"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Derive the writes `status` implies for `payment` from current state.
    async fn plan(&self, payment: &CryptoPayment, status: ProviderStatus) -> Result<Plan> {
        let mut unit = UnitOfWork::new("webhook.apply");
        let advanced = payment.status.advance_to(CryptoPaymentStatus::from(status));
        if let Some(next) = advanced {
            unit = unit.push(LedgerWrite::SetPaymentStatus {
                payment: payment.id,
                status: next,
            });
        }
        let advanced_outcome = advanced.map_or(
            WebhookOutcome::Unchanged(payment.status),
            WebhookOutcome::Advanced,
        );

        let (Some(settle_to), Some(tx_id)) = (status.settles_to(), payment.transaction_id) else {
            return Ok(Plan {
                unit,
                outcome: advanced_outcome,
            });
        };
        let Some(transaction) = self.ledger.transaction(tx_id).await? else {
            return Err(PayledgerError::RecordNotFound {
                entity: StaleEntity::Transaction,
                id: tx_id.to_string(),
            });
        };
        if transaction.status != TransactionStatus::Pending {
            return Ok(Plan {
                unit,
                outcome: advanced_outcome,
            });
        }

        unit = unit.push(LedgerWrite::TransitionTransaction {
            transaction: tx_id,
            to: settle_to,
        });

        let outcome = match settle_to {
            TransactionStatus::Success => {
                let bonuses = self.ledger.pending_deposit_bonuses(payment.user_id).await?;
                let bonus_plan = plan_deposit_bonuses(&bonuses, transaction.amount, Utc::now());
                if bonus_plan.activated > 0 {
                    tracing::info!(
                        user = %payment.user_id.short(),
                        activated = bonus_plan.activated,
                        credited = %bonus_plan.credited,
                        "Deposit activates bonuses"
                    );
                }
                let bonuses_activated = bonus_plan.activated;
                unit = unit.extend(bonus_plan.writes);
                WebhookOutcome::Settled {
                    transaction: tx_id,
                    bonuses_activated,
                }
            }
            TransactionStatus::Fail | TransactionStatus::Pending => {
                WebhookOutcome::Voided { transaction: tx_id }
            }
        };

        Ok(Plan { unit, outcome })
    }
}
