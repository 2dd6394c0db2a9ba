//! Payment provider contract and its NOWPayments implementation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use payledger_types::{ExternalPaymentId, GatewayConfig, PayledgerError, string_or_number};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::GatewayClientError;
use crate::rates::{PriceError, PriceSource};

/// Provider message bodies longer than this are cut in error text.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Request to open a deposit payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatePayment {
    #[serde(with = "rust_decimal::serde::float")]
    pub price_amount: Decimal,
    pub price_currency: String,
    pub pay_currency: String,
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_description: Option<String>,
}

/// Provider's answer to [`CreatePayment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCreated {
    pub payment_id: ExternalPaymentId,
    pub pay_address: String,
    pub pay_amount: Decimal,
    pub pay_currency: String,
    pub price_amount: Decimal,
    pub price_currency: String,
    #[serde(default)]
    pub expiration_estimate_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub qr_code: Option<String>,
}

/// One destination of a mass payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutInstruction {
    pub address: String,
    pub currency: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// Provider's answer to a payout request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PayoutCreated {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

/// Outbound calls to the crypto payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment(
        &self,
        request: &CreatePayment,
    ) -> Result<PaymentCreated, GatewayClientError>;

    async fn create_mass_payout(
        &self,
        withdrawals: &[PayoutInstruction],
    ) -> Result<PayoutCreated, GatewayClientError>;
}

#[derive(Serialize)]
struct PaymentBody<'a> {
    #[serde(flatten)]
    request: &'a CreatePayment,
    #[serde(skip_serializing_if = "Option::is_none")]
    ipn_callback_url: Option<&'a str>,
}

#[derive(Serialize)]
struct AuthBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthToken {
    token: String,
}

#[derive(Serialize)]
struct PayoutBody<'a> {
    withdrawals: &'a [PayoutInstruction],
}

#[derive(Deserialize)]
struct Estimate {
    estimated_amount: Decimal,
}

#[derive(Deserialize)]
struct ProviderMessage {
    message: String,
}

/// HTTP client for the NOWPayments v1 API.
#[derive(Debug, Clone)]
pub struct NowPaymentsClient {
    base_url: String,
    api_key: String,
    email: String,
    password: String,
    ipn_callback_url: Option<String>,
    timeout: Duration,
    http: reqwest::Client,
}

impl NowPaymentsClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, PayledgerError> {
        let base_url = config.base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(PayledgerError::Configuration(
                "gateway base url is empty".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| PayledgerError::Configuration(format!("http client: {e}")))?;

        Ok(Self {
            base_url: base_url.to_string(),
            api_key: config.api_key.clone(),
            email: config.email.clone(),
            password: config.password.clone(),
            ipn_callback_url: config.ipn_callback_url.clone(),
            timeout: config.timeout(),
            http,
        })
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Quote `amount` of `from` in `to` via `GET /estimate`.
    pub async fn fetch_estimate(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
    ) -> Result<Decimal, GatewayClientError> {
        let url = reqwest::Url::parse_with_params(
            &self.endpoint("/estimate"),
            &[
                ("amount", amount.to_string()),
                ("currency_from", from.to_lowercase()),
                ("currency_to", to.to_lowercase()),
            ],
        )
        .map_err(GatewayClientError::transport)?;

        let response = self
            .http
            .get(url)
            .header("x-api-key", &self.api_key)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(GatewayClientError::transport)?;
        let estimate: Estimate = decode_response(response).await?;
        Ok(estimate.estimated_amount)
    }

    /// Exchange the payout account credentials for a bearer token.
    async fn fetch_token(&self) -> Result<String, GatewayClientError> {
        let response = self
            .http
            .post(self.endpoint("/auth"))
            .timeout(self.timeout)
            .json(&AuthBody {
                email: &self.email,
                password: &self.password,
            })
            .send()
            .await
            .map_err(GatewayClientError::transport)?;

        let token: AuthToken = decode_response(response).await.map_err(|e| match e {
            GatewayClientError::Api { status, message } => GatewayClientError::Auth {
                message: format!("HTTP {status}: {message}"),
            },
            other => other,
        })?;
        if token.token.trim().is_empty() {
            return Err(GatewayClientError::Auth {
                message: "empty token".into(),
            });
        }
        Ok(token.token)
    }
}

#[async_trait]
impl PaymentGateway for NowPaymentsClient {
    async fn create_payment(
        &self,
        request: &CreatePayment,
    ) -> Result<PaymentCreated, GatewayClientError> {
        let response = self
            .http
            .post(self.endpoint("/payment"))
            .header("x-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(&PaymentBody {
                request,
                ipn_callback_url: self.ipn_callback_url.as_deref(),
            })
            .send()
            .await
            .map_err(GatewayClientError::transport)?;
        let created: PaymentCreated = decode_response(response).await?;
        tracing::debug!(
            order_id = %request.order_id,
            payment_id = %created.payment_id,
            pay_currency = %created.pay_currency,
            "Provider payment created"
        );
        Ok(created)
    }

    async fn create_mass_payout(
        &self,
        withdrawals: &[PayoutInstruction],
    ) -> Result<PayoutCreated, GatewayClientError> {
        let token = self.fetch_token().await?;
        let response = self
            .http
            .post(self.endpoint("/payout/create"))
            .bearer_auth(token)
            .timeout(self.timeout)
            .json(&PayoutBody { withdrawals })
            .send()
            .await
            .map_err(GatewayClientError::transport)?;
        let payout: PayoutCreated = decode_response(response).await?;
        tracing::debug!(payout_id = %payout.id, count = withdrawals.len(), "Provider payout created");
        Ok(payout)
    }
}

#[async_trait]
impl PriceSource for NowPaymentsClient {
    async fn estimate(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal, PriceError> {
        self.fetch_estimate(amount, from, to)
            .await
            .map_err(PriceError::from)
    }
}

async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, GatewayClientError> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(GatewayClientError::transport)?;

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(GatewayClientError::RateLimited);
    }
    if !status.is_success() {
        return Err(GatewayClientError::Api {
            status: status.as_u16(),
            message: provider_message(&bytes),
        });
    }
    serde_json::from_slice(&bytes).map_err(|e| GatewayClientError::Parse {
        message: e.to_string(),
    })
}

/// The provider's `message` field when present, else the raw body.
fn provider_message(body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ProviderMessage>(body) {
        return parsed.message;
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return "<empty>".to_string();
    }
    text.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
