//! Route handlers.
//!
//! JSON bodies are read as raw bytes and parsed here so malformed input
//! surfaces as `PL_ERR_100` instead of the framework's own rejection.

use std::str::FromStr;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use payledger_settlement::{DepositDetails, InitiateDeposit, InitiateWithdrawal, WithdrawalReceipt};
use payledger_types::constants::{SERVICE_NAME, VERSION, WEBHOOK_SIGNATURE_HEADER};
use payledger_types::{BalanceSnapshot, PayledgerError, Transaction, TransactionCategory};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::routes::AppState;

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError(PayledgerError::invalid(format!("malformed body: {e}"))))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME, "version": VERSION }))
}

pub async fn create_deposit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> Result<Json<DepositDetails>, ApiError> {
    let request: InitiateDeposit = parse_json(&body)?;
    let details = state.engine.initiate_deposit(user, &request).await?;
    Ok(Json(details))
}

pub async fn create_withdrawal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> Result<Json<WithdrawalReceipt>, ApiError> {
    let request: InitiateWithdrawal = parse_json(&body)?;
    let receipt = state.engine.initiate_withdrawal(user, &request).await?;
    Ok(Json(receipt))
}

/// Provider notification. Anything the engine accepts, including
/// duplicates and unrecognized statuses, is acknowledged with 200 so the
/// provider stops retrying.
pub async fn nowpayments_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let outcome = state.engine.handle_webhook(&body, signature).await?;
    tracing::debug!(?outcome, "Webhook acknowledged");
    Ok(Json(json!({ "received": true })))
}

pub async fn balance(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<BalanceSnapshot>, ApiError> {
    Ok(Json(state.engine.balance(user).await?))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    transactions: Vec<Transaction>,
}

pub async fn transactions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let category = query
        .category
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(TransactionCategory::from_str)
        .transpose()
        .map_err(|err| ApiError(PayledgerError::invalid(err.to_string())))?;
    let transactions = state.engine.transaction_history(user, category).await?;
    Ok(Json(HistoryResponse { transactions }))
}
