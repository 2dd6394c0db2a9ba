//! System-wide constants for payledger.

/// Platform accounting currency. All ledger amounts are denominated in it.
pub const BASE_CURRENCY: &str = "inr";

/// Currency the payment provider prices invoices in.
pub const PRICING_CURRENCY: &str = "usd";

/// Smallest deposit accepted, in the base currency.
pub const DEFAULT_MIN_DEPOSIT: i64 = 100;

/// Largest deposit accepted, in the base currency.
pub const DEFAULT_MAX_DEPOSIT: i64 = 100_000;

/// Smallest withdrawal accepted, in the base currency.
pub const DEFAULT_MIN_WITHDRAWAL: i64 = 100;

/// Pay currencies offered to users.
pub const DEFAULT_SUPPORTED_CURRENCIES: &[&str] = &[
    "usdttrc20",
    "usdterc20",
    "usdcerc20",
    "usdcsol",
    "eth",
    "btc",
    "sol",
    "ltc",
];

/// How long a cached conversion rate stays valid, in seconds.
pub const RATE_CACHE_TTL_SECS: u64 = 300;

/// Total pricing queries per conversion before giving up on rate limits.
pub const RATE_MAX_ATTEMPTS: u32 = 3;

/// Backoff before the first retry; doubles per further attempt.
pub const RATE_BASE_BACKOFF_MS: u64 = 1000;

/// Payment provider API root.
pub const DEFAULT_GATEWAY_BASE_URL: &str = "https://api.nowpayments.io/v1";

/// Outbound provider call timeout, in milliseconds.
pub const DEFAULT_GATEWAY_TIMEOUT_MS: u64 = 15_000;

/// Header carrying the provider's webhook HMAC.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-nowpayments-sig";

/// Header carrying the authenticated principal set by the upstream auth layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Times a deposit finalization is re-planned after losing a bonus race.
pub const MAX_FINALIZE_ATTEMPTS: u32 = 3;

/// Characters of a withdrawal address shown in ledger descriptions.
pub const ADDRESS_PREVIEW_CHARS: usize = 10;

/// Default API listen port.
pub const DEFAULT_API_PORT: u16 = 8080;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service name.
pub const SERVICE_NAME: &str = "payledger";
