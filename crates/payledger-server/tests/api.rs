//! In-process HTTP tests: requests go through the real router, extractors,
//! and error mapping against the settlement engine with stub providers.

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use payledger_gateway::testing::{StubGateway, StubPriceSource};
use payledger_gateway::{IpnVerifier, RateConverter};
use payledger_ledger::{InMemoryBalanceCache, InMemoryLedger};
use payledger_server::{AppState, build_router};
use payledger_settlement::SettlementEngine;
use payledger_types::constants::{USER_ID_HEADER, WEBHOOK_SIGNATURE_HEADER};
use payledger_types::{RateConfig, SettlementConfig, UserId};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;

const IPN_SECRET: &str = "api-test-secret";

struct TestApp {
    router: Router,
    gateway: Arc<StubGateway>,
    verifier: IpnVerifier,
}

fn test_app() -> TestApp {
    let ledger = Arc::new(InMemoryLedger::new());
    let cache = Arc::new(InMemoryBalanceCache::new(ledger.clone()));
    let prices = Arc::new(StubPriceSource::new().with_rate("inr", "usd", Decimal::new(12, 3)));
    let gateway = Arc::new(StubGateway::new());
    let verifier = IpnVerifier::new(IPN_SECRET);
    let engine = SettlementEngine::new(
        ledger,
        cache,
        Arc::new(RateConverter::new(prices, RateConfig::default())),
        gateway.clone(),
        verifier.clone(),
        SettlementConfig::default(),
    );
    TestApp {
        router: build_router(AppState::new(engine)),
        gateway,
        verifier,
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.router.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

fn post_as(user: UserId, uri: &str, body: &Value) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(USER_ID_HEADER, user.to_string())
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))?)
}

fn get_as(user: UserId, uri: &str) -> Result<Request<Body>> {
    Ok(Request::builder()
        .uri(uri)
        .header(USER_ID_HEADER, user.to_string())
        .body(Body::empty())?)
}

fn webhook(body: &str, signature: Option<String>) -> Result<Request<Body>> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/webhooks/nowpayments");
    if let Some(signature) = signature {
        builder = builder.header(WEBHOOK_SIGNATURE_HEADER, signature);
    }
    Ok(builder.body(Body::from(body.to_string()))?)
}

fn signed_webhook(app: &TestApp, payment_id: &str, status: &str) -> Result<Request<Body>> {
    let body = json!({ "payment_id": payment_id, "payment_status": status }).to_string();
    let signature = app.verifier.sign(body.as_bytes())?;
    webhook(&body, Some(signature))
}

/// Create a deposit over HTTP and return its provider payment id.
async fn deposit(app: &TestApp, user: UserId, amount: u64) -> Result<String> {
    let (status, body) = send(
        app,
        post_as(
            user,
            "/api/crypto/deposit",
            &json!({ "amountInBaseCurrency": amount, "payCurrency": "btc" }),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    Ok(body["paymentId"].as_str().unwrap_or_default().to_string())
}

async fn funded_user(app: &TestApp, amount: u64) -> Result<UserId> {
    let user = UserId::new();
    let payment_id = deposit(app, user, amount).await?;
    let (status, _) = send(app, signed_webhook(app, &payment_id, "finished")?).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(user)
}

fn error_code(body: &Value) -> &str {
    body.pointer("/error/code").and_then(Value::as_str).unwrap_or_default()
}

#[tokio::test]
async fn health_is_public() -> Result<()> {
    let app = test_app();
    let (status, body) = send(
        &app,
        Request::builder().uri("/health").body(Body::empty())?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "payledger");
    Ok(())
}

#[tokio::test]
async fn user_routes_require_principal() -> Result<()> {
    let app = test_app();
    let body = json!({ "amountInBaseCurrency": 1000, "payCurrency": "btc" });

    let anonymous = Request::builder()
        .method(Method::POST)
        .uri("/api/crypto/deposit")
        .body(Body::from(body.to_string()))?;
    let (status, response) = send(&app, anonymous).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&response), "PL_ERR_101");

    let garbage = Request::builder()
        .uri("/api/balance")
        .header(USER_ID_HEADER, "not-a-uuid")
        .body(Body::empty())?;
    let (status, _) = send(&app, garbage).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(app.gateway.payments().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn deposit_returns_payment_details() -> Result<()> {
    let app = test_app();
    let user = UserId::new();
    let (status, body) = send(
        &app,
        post_as(
            user,
            "/api/crypto/deposit",
            &json!({ "amountInBaseCurrency": "1000", "payCurrency": "BTC" }),
        )?,
    )
    .await?;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["paymentId"].as_str().is_some());
    assert!(body["address"].as_str().is_some_and(|a| a.starts_with("stub-btc-")));
    assert!(body["qrCode"].as_str().is_some());
    assert_eq!(body["currency"], "btc");
    assert_eq!(body["amountInBaseCurrency"], "1000");
    assert!(body.get("expiresAt").is_some());

    let (_, balance) = send(&app, get_as(user, "/api/balance")?).await?;
    assert_eq!(balance["available"], "0");
    assert_eq!(balance["pending"], "1000");
    Ok(())
}

#[tokio::test]
async fn deposit_rejects_bad_input() -> Result<()> {
    let app = test_app();
    let user = UserId::new();

    for body in [
        json!({ "payCurrency": "btc" }),
        json!({ "amountInBaseCurrency": 0, "payCurrency": "btc" }),
        json!({ "amountInBaseCurrency": 50, "payCurrency": "btc" }),
        json!({ "amountInBaseCurrency": 1000, "payCurrency": "doge" }),
    ] {
        let (status, response) = send(&app, post_as(user, "/api/crypto/deposit", &body)?).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(error_code(&response), "PL_ERR_100");
        assert_eq!(response["error"]["message"], "Invalid request");
    }

    let raw = Request::builder()
        .method(Method::POST)
        .uri("/api/crypto/deposit")
        .header(USER_ID_HEADER, user.to_string())
        .body(Body::from("{not json"))?;
    let (status, _) = send(&app, raw).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.gateway.payments().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn provider_failure_is_generic_500() -> Result<()> {
    let app = test_app();
    app.gateway.fail_payments(true);

    let (status, body) = send(
        &app,
        post_as(
            UserId::new(),
            "/api/crypto/deposit",
            &json!({ "amountInBaseCurrency": 1000, "payCurrency": "btc" }),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(&body), "PL_ERR_300");
    assert_eq!(body["error"]["message"], "Internal error");
    assert!(!body.to_string().contains("stub payment failure"));
    Ok(())
}

#[tokio::test]
async fn webhook_settles_deposit() -> Result<()> {
    let app = test_app();
    let user = UserId::new();
    let payment_id = deposit(&app, user, 1000).await?;

    let (status, body) = send(&app, signed_webhook(&app, &payment_id, "finished")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "received": true }));

    let (_, balance) = send(&app, get_as(user, "/api/balance")?).await?;
    assert_eq!(balance["available"], "1000");
    assert_eq!(balance["pending"], "0");

    // Duplicates and unknown statuses are still acknowledged.
    for status_str in ["finished", "confirming", "partially_paid"] {
        let (status, body) = send(&app, signed_webhook(&app, &payment_id, status_str)?).await?;
        assert_eq!(status, StatusCode::OK, "{status_str}");
        assert_eq!(body["received"], true);
    }
    let (_, balance) = send(&app, get_as(user, "/api/balance")?).await?;
    assert_eq!(balance["available"], "1000");
    Ok(())
}

#[tokio::test]
async fn webhook_rejects_bad_signature_and_unknown_payment() -> Result<()> {
    let app = test_app();
    let user = UserId::new();
    let payment_id = deposit(&app, user, 1000).await?;
    let body = json!({ "payment_id": payment_id, "payment_status": "finished" }).to_string();

    let (status, response) = send(&app, webhook(&body, None)?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&response), "PL_ERR_400");

    let forged = IpnVerifier::new("wrong").sign(body.as_bytes())?;
    let (status, _) = send(&app, webhook(&body, Some(forged))?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, response) = send(&app, signed_webhook(&app, "424242", "finished")?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&response), "PL_ERR_401");

    // Nothing was credited.
    let (_, balance) = send(&app, get_as(user, "/api/balance")?).await?;
    assert_eq!(balance["available"], "0");
    Ok(())
}

#[tokio::test]
async fn withdrawal_flow() -> Result<()> {
    let app = test_app();
    let user = funded_user(&app, 1000).await?;

    let (status, body) = send(
        &app,
        post_as(
            user,
            "/api/crypto/withdrawal",
            &json!({
                "amountInBaseCurrency": 400,
                "currency": "usdttrc20",
                "address": "TXYZ1234567890abcdefghij"
            }),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert!(body["payoutId"].as_str().is_some_and(|id| id.starts_with("payout-")));
    assert!(body["withdrawalId"].as_str().is_some());

    let (_, balance) = send(&app, get_as(user, "/api/balance")?).await?;
    assert_eq!(balance["available"], "600");

    let (status, body) = send(
        &app,
        post_as(
            user,
            "/api/crypto/withdrawal",
            &json!({
                "amountInBaseCurrency": 700,
                "currency": "usdttrc20",
                "address": "TXYZ1234567890abcdefghij"
            }),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "PL_ERR_200");
    assert_eq!(body["error"]["message"], "Insufficient funds");
    assert_eq!(app.gateway.payouts().await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn payout_failure_releases_funds() -> Result<()> {
    let app = test_app();
    let user = funded_user(&app, 1000).await?;
    app.gateway.fail_payouts(true);

    let (status, body) = send(
        &app,
        post_as(
            user,
            "/api/crypto/withdrawal",
            &json!({
                "amountInBaseCurrency": 500,
                "currency": "btc",
                "address": "bc1qexampleaddress000000"
            }),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(&body), "PL_ERR_301");
    assert_eq!(body["error"]["message"], "Payout failed");

    let (_, balance) = send(&app, get_as(user, "/api/balance")?).await?;
    assert_eq!(balance["available"], "1000");

    let (_, history) = send(&app, get_as(user, "/api/transactions")?).await?;
    let latest = &history["transactions"][0];
    assert_eq!(latest["type"], "withdrawal");
    assert_eq!(latest["status"], "fail");
    Ok(())
}

#[tokio::test]
async fn history_filters_by_category() -> Result<()> {
    let app = test_app();
    let user = funded_user(&app, 1000).await?;

    let (status, all) = send(&app, get_as(user, "/api/transactions")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["transactions"].as_array().map(Vec::len), Some(1));
    assert_eq!(all["transactions"][0]["category"], "transaction");
    assert_eq!(all["transactions"][0]["status"], "success");

    let (status, bonus) = send(&app, get_as(user, "/api/transactions?category=bonus")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bonus["transactions"], json!([]));

    let (status, body) = send(&app, get_as(user, "/api/transactions?category=casino")?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "PL_ERR_100");
    Ok(())
}
