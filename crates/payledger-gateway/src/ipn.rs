//! Instant payment notification (webhook) authentication.
//!
//! The provider signs the raw request body with HMAC-SHA512 keyed by the shared
//! IPN secret and sends the hex digest in `x-nowpayments-sig`.

use hmac::{Hmac, Mac};
use payledger_types::{PayledgerError, Result};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Verifies webhook signatures against the shared secret.
#[derive(Clone)]
pub struct IpnVerifier {
    secret: String,
}

impl std::fmt::Debug for IpnVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpnVerifier").finish_non_exhaustive()
    }
}

impl IpnVerifier {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Check `signature` (hex) against `body`. A missing or malformed header,
    /// or an unset secret, is rejected like a mismatch.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<()> {
        if self.secret.is_empty() {
            tracing::warn!("IPN secret is not configured; rejecting webhook");
            return Err(PayledgerError::InvalidSignature);
        }
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(PayledgerError::InvalidSignature)?;
        let expected = hex::decode(signature).map_err(|_| PayledgerError::InvalidSignature)?;

        let mut mac = self.mac()?;
        mac.update(body);
        mac.verify_slice(&expected)
            .map_err(|_| PayledgerError::InvalidSignature)
    }

    /// Hex HMAC of `body`, as the provider would send it.
    pub fn sign(&self, body: &[u8]) -> Result<String> {
        let mut mac = self.mac()?;
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn mac(&self) -> Result<HmacSha512> {
        HmacSha512::new_from_slice(self.secret.as_bytes())
            .map_err(|e| PayledgerError::Configuration(format!("ipn secret: {e}")))
    }
}
