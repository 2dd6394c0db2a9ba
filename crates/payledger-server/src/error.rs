//! Mapping of [`PayledgerError`] onto HTTP responses.
//!
//! Bodies carry the error code and a generic message only; the full error
//! goes to the log.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use payledger_types::PayledgerError;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: &'static str,
}

#[derive(Debug)]
pub struct ApiError(pub PayledgerError);

impl From<PayledgerError> for ApiError {
    fn from(err: PayledgerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = self.0.code();
        if status.is_server_error() {
            tracing::error!(code, status = status.as_u16(), error = %self.0, "Request failed");
        } else {
            tracing::warn!(code, status = status.as_u16(), error = %self.0, "Request rejected");
        }

        let body = Json(ErrorResponse {
            error: ErrorBody {
                code,
                message: self.0.public_message(),
            },
        });
        (status, body).into_response()
    }
}
