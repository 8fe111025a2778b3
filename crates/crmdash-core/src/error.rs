// ── Core error types ──
//
// `CoreError` covers construction-time failures only: an aggregation pass
// never returns an error. Per-source failures are `SourceError` values that
// the aggregator turns into fallbacks and warnings.

use thiserror::Error;

use crate::model::{Source, SourceWarning, WarningKind};

/// Unified error type for building a [`Dashboard`](crate::Dashboard).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid backend URL: {message}")]
    InvalidUrl { message: String },

    #[error("HTTP client setup failed: {message}")]
    ClientSetup { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl From<crmdash_api::Error> for CoreError {
    fn from(err: crmdash_api::Error) -> Self {
        match err {
            crmdash_api::Error::InvalidUrl(e) => CoreError::InvalidUrl {
                message: e.to_string(),
            },
            crmdash_api::Error::InvalidToken { reason } => CoreError::Config {
                message: format!("invalid bearer token: {reason}"),
            },
            other => CoreError::ClientSetup {
                message: other.to_string(),
            },
        }
    }
}

/// Failure of a single source endpoint during an aggregation pass.
///
/// Recovered locally: the affected summary or series falls back to zero or
/// synthetic values and the pass continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The backend rejected the bearer token (401/403).
    #[error("{origin} rejected the credentials: {reason}")]
    Unauthorized { origin: Source, reason: String },

    /// No response within the configured timeout.
    #[error("{origin} timed out")]
    TimedOut { origin: Source },

    /// Unreachable, non-2xx, or a `success: false` envelope.
    #[error("{origin} unavailable: {reason}")]
    Unavailable { origin: Source, reason: String },

    /// Envelope present but an expected field is missing or wrong-typed.
    #[error("{origin} returned a malformed response (field `{field}`)")]
    Malformed { origin: Source, field: String },
}

impl SourceError {
    /// Classify an API error for the given source.
    pub fn from_api(origin: Source, err: &crmdash_api::Error) -> Self {
        if err.is_auth() {
            return Self::Unauthorized {
                origin,
                reason: err.to_string(),
            };
        }
        if err.is_timeout() {
            return Self::TimedOut { origin };
        }
        match err.malformed_field() {
            Some(field) => Self::Malformed {
                origin,
                field: field.to_owned(),
            },
            None => Self::Unavailable {
                origin,
                reason: err.to_string(),
            },
        }
    }

    pub fn origin(&self) -> Source {
        match self {
            Self::Unauthorized { origin, .. }
            | Self::TimedOut { origin }
            | Self::Unavailable { origin, .. }
            | Self::Malformed { origin, .. } => *origin,
        }
    }

    /// Convert into the warning published on the dashboard state.
    pub fn into_warning(self) -> SourceWarning {
        match self {
            Self::Unauthorized { origin, reason } => SourceWarning {
                source: origin,
                kind: WarningKind::Unauthorized { reason },
            },
            Self::TimedOut { origin } => SourceWarning {
                source: origin,
                kind: WarningKind::TimedOut,
            },
            Self::Unavailable { origin, reason } => SourceWarning {
                source: origin,
                kind: WarningKind::Unavailable { reason },
            },
            Self::Malformed { origin, field } => SourceWarning {
                source: origin,
                kind: WarningKind::Malformed { field },
            },
        }
    }
}
