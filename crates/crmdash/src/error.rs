//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use crmdash_config::ConfigError;
use crmdash_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not set up a client for {url}")]
    #[diagnostic(
        code(crmdash::connection_failed),
        help(
            "Check the base URL and TLS settings.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("No dashboard source could be loaded from {url}")]
    #[diagnostic(
        code(crmdash::all_sources_failed),
        help(
            "Check that the backend is running and reachable.\n\
             Run with -v to see each source's error, or try --insecure for\n\
             a self-signed certificate."
        )
    )]
    AllSourcesFailed { url: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("The backend rejected the bearer token")]
    #[diagnostic(
        code(crmdash::auth_failed),
        help(
            "Tokens are issued by the external auth service and may have expired.\n\
             Store a fresh one with: crmdash config set-token --profile {profile}\n\
             Or set the CRMDASH_TOKEN environment variable."
        )
    )]
    AuthFailed { profile: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Every source timed out after {seconds}s")]
    #[diagnostic(
        code(crmdash::timeout),
        help("Increase timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(crmdash::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(crmdash::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: crmdash config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(crmdash::no_config),
        help(
            "Create one with: crmdash config init\n\
             Or pass --base-url (-u) / set CRMDASH_BASE_URL.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(crmdash::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    #[diagnostic(code(crmdash::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    #[diagnostic(code(crmdash::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::AllSourcesFailed { .. } => {
                exit_code::CONNECTION
            }
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Comma-separated profile names for help text.
    pub fn available_profiles(names: &[&str]) -> String {
        if names.is_empty() {
            "(none)".into()
        } else {
            names.join(", ")
        }
    }
}

// ── CoreError / ConfigError → CliError mapping ───────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidUrl { message } => CliError::Validation {
                field: "base_url".into(),
                reason: message,
            },
            CoreError::ClientSetup { message } => CliError::ConnectionFailed {
                url: "(client setup)".into(),
                reason: message,
            },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_the_error_class() {
        assert_eq!(
            CliError::AuthFailed {
                profile: "default".into()
            }
            .exit_code(),
            exit_code::AUTH
        );
        assert_eq!(
            CliError::AllSourcesFailed {
                url: "http://localhost".into()
            }
            .exit_code(),
            exit_code::CONNECTION
        );
        assert_eq!(CliError::Timeout { seconds: 5 }.exit_code(), exit_code::TIMEOUT);
        assert_eq!(
            CliError::NoConfig {
                path: String::new()
            }
            .exit_code(),
            exit_code::GENERAL
        );
    }

    #[test]
    fn config_validation_is_a_usage_error() {
        let err = CliError::from(ConfigError::Validation {
            field: "page_limit".into(),
            reason: "must be at least 1".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn invalid_url_is_a_usage_error() {
        let err = CliError::from(CoreError::InvalidUrl {
            message: "relative URL without a base".into(),
        });
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "base_url"));
    }
}
