use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use payledger_settlement::SettlementEngine;
use tower_http::trace::TraceLayer;

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SettlementEngine>,
}

impl AppState {
    pub fn new(engine: SettlementEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/crypto/deposit", post(handlers::create_deposit))
        .route("/api/crypto/withdrawal", post(handlers::create_withdrawal))
        .route(
            "/api/webhooks/nowpayments",
            post(handlers::nowpayments_webhook),
        )
        .route("/api/balance", get(handlers::balance))
        .route("/api/transactions", get(handlers::transactions))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
