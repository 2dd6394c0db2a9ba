//! Authenticated principal.
//!
//! Session handling lives in the upstream auth layer, which forwards the
//! signed-in user's id in [`USER_ID_HEADER`].

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use payledger_types::constants::USER_ID_HEADER;
use payledger_types::{PayledgerError, UserId};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<UserId>().ok())
            .map(Self)
            .ok_or(ApiError(PayledgerError::Unauthorized))
    }
}
