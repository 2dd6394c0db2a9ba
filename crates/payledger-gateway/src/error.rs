use payledger_types::PayledgerError;
use thiserror::Error;

/// Failures talking to the payment provider.
#[derive(Debug, Error)]
pub enum GatewayClientError {
    #[error("gateway request failed: {message}")]
    Transport { message: String },

    #[error("gateway returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("gateway response could not be decoded: {message}")]
    Parse { message: String },

    #[error("gateway rate limit exceeded")]
    RateLimited,

    #[error("gateway authentication failed: {message}")]
    Auth { message: String },
}

impl GatewayClientError {
    pub(crate) fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }
}

impl From<GatewayClientError> for PayledgerError {
    fn from(err: GatewayClientError) -> Self {
        Self::Gateway {
            reason: err.to_string(),
        }
    }
}
