//! Identifiers used throughout payledger.
//!
//! Internal entity IDs use UUIDv7 for time-ordered lexicographic sorting.
//! Identifiers issued by the payment provider are kept as opaque strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, de};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Short form used in log lines.
            #[must_use]
            pub fn short(&self) -> String {
                format!(concat!($prefix, ":{}"), &self.0.simple().to_string()[..12])
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a platform account.
    UserId,
    "user"
);

uuid_id!(
    /// Identifier of a ledger [`Transaction`](crate::Transaction).
    TransactionId,
    "tx"
);

uuid_id!(
    /// Internal identifier of a [`CryptoPayment`](crate::CryptoPayment) row.
    CryptoPaymentId,
    "cp"
);

uuid_id!(
    /// Identifier of a [`WithdrawalRequest`](crate::WithdrawalRequest).
    WithdrawalId,
    "wd"
);

uuid_id!(
    /// Identifier of a [`Bonus`](crate::Bonus).
    BonusId,
    "bonus"
);

// ---------------------------------------------------------------------------
// ExternalPaymentId
// ---------------------------------------------------------------------------

/// Payment identifier issued by the payment provider. Globally unique.
///
/// The provider sends it as a JSON number in some payloads and as a string in
/// others; both deserialize to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ExternalPaymentId(pub String);

impl ExternalPaymentId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalPaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ExternalPaymentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(StringOrNumber).map(Self)
    }
}

/// Accepts a JSON string or integer and yields its string form.
pub(crate) struct StringOrNumber;

impl de::Visitor<'_> for StringOrNumber {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or integer identifier")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        if v.trim().is_empty() {
            return Err(E::invalid_value(de::Unexpected::Str(v), &self));
        }
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }
}

/// `deserialize_with` helper for provider identifiers that are not wrapped in a
/// newtype (payout ids, order ids).
pub fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    deserializer.deserialize_any(StringOrNumber)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
