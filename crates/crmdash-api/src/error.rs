use thiserror::Error;

/// Top-level error type for the `crmdash-api` crate.
///
/// Covers transport failures, non-2xx responses, `success: false`
/// envelopes, and bodies whose shape does not match the consumed contract.
/// `crmdash-core` folds these into per-source diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Bearer token missing, expired, or rejected (HTTP 401/403).
    #[error("Request to {endpoint} was rejected (HTTP {status}): check the bearer token")]
    Unauthorized { endpoint: String, status: u16 },

    /// The configured token cannot be sent as an HTTP header value.
    #[error("Invalid bearer token: {reason}")]
    InvalidToken { reason: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Backend responses ───────────────────────────────────────────
    /// Non-2xx status other than an auth rejection.
    #[error("HTTP {status} from {endpoint}: {message}")]
    Http {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// The envelope arrived but declared `success: false`.
    #[error("{endpoint} reported failure: {message}")]
    Unsuccessful { endpoint: String, message: String },

    /// The envelope is missing an expected field or has it with the wrong type.
    #[error("{endpoint} returned a malformed body: missing or invalid `{field}`")]
    Malformed { endpoint: String, field: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the backend rejected our credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::InvalidToken { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns `true` if the request hit the transport timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Http { status: 404, .. } => true,
            _ => false,
        }
    }

    /// The name of the offending field when the body was malformed.
    pub fn malformed_field(&self) -> Option<&str> {
        if let Self::Malformed { field, .. } = self {
            Some(field)
        } else {
            None
        }
    }
}
