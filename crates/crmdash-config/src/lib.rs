//! Shared configuration for the crmdash CLI.
//!
//! TOML profiles, bearer-token resolution (env + keyring + plaintext),
//! and translation to `crmdash_core::DashboardConfig`. The CLI adds
//! flag-aware overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crmdash_core::{DashboardConfig, Endpoints, TlsVerification};

/// Keyring service name; entries are keyed `<profile>/token`.
pub const KEYRING_SERVICE: &str = "crmdash";

/// Environment variable consulted for the bearer token after `token_env`.
pub const TOKEN_ENV: &str = "CRMDASH_TOKEN";

const ENV_PREFIX: &str = "CRMDASH_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Profile names, sorted.
    pub fn profile_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_fast_interval")]
    pub fast_interval_secs: u64,

    #[serde(default = "default_slow_interval")]
    pub slow_interval_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            fast_interval_secs: default_fast_interval(),
            slow_interval_secs: default_slow_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_fast_interval() -> u64 {
    DashboardConfig::DEFAULT_FAST_INTERVAL.as_secs()
}
fn default_slow_interval() -> u64 {
    DashboardConfig::DEFAULT_SLOW_INTERVAL.as_secs()
}

/// A named backend profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Backend base URL (e.g., "https://crm.example.com").
    pub base_url: String,

    /// Bearer token (plaintext, prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the bearer token.
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Summaries refresh period in seconds; 0 disables.
    pub fast_interval_secs: Option<u64>,

    /// Charts refresh period in seconds; 0 disables.
    pub slow_interval_secs: Option<u64>,

    /// `limit` requested from list endpoints.
    pub page_limit: Option<u32>,

    /// Months in a synthetic chart series.
    pub series_len: Option<usize>,

    /// Endpoint path overrides. An empty optional path disables that source.
    #[serde(default)]
    pub endpoints: Endpoints,
}

impl Profile {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "crmdash", "crmdash").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("crmdash");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
///
/// Layers: built-in defaults, then the TOML file (if present), then
/// `CRMDASH_*` variables with `__` separating nested keys
/// (`CRMDASH_DEFAULTS__TIMEOUT=5`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is invalid.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_else(|e| {
        debug!(error = %e, "using default config");
        Config::default()
    })
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution (without CLI flags) ────────────────────────────

fn keyring_user(profile_name: &str) -> String {
    format!("{profile_name}/token")
}

/// Resolve the bearer token from the credential chain (no CLI flag step).
///
/// Order: the profile's `token_env` variable, `CRMDASH_TOKEN`, the system
/// keyring, then plaintext `token` in the profile. `None` means requests
/// go out unauthenticated.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    resolve_token_from(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        |user| {
            keyring::Entry::new(KEYRING_SERVICE, user)
                .and_then(|entry| entry.get_password())
                .ok()
        },
    )
}

/// [`resolve_token`] with injectable environment and keyring lookups.
pub fn resolve_token_from(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Option<SecretString> {
    let non_empty = |v: String| (!v.trim().is_empty()).then(|| SecretString::from(v));

    // 1. Profile's token_env -> env var lookup
    if let Some(token) = profile
        .token_env
        .as_deref()
        .and_then(&env)
        .and_then(non_empty)
    {
        return Some(token);
    }

    // 2. Global token variable
    if let Some(token) = env(TOKEN_ENV).and_then(non_empty) {
        return Some(token);
    }

    // 3. System keyring
    if let Some(token) = keyring(&keyring_user(profile_name)).and_then(non_empty) {
        return Some(token);
    }

    // 4. Plaintext in config
    profile.token.clone().and_then(non_empty)
}

/// Store a bearer token in the system keyring for `profile_name`.
pub fn store_token_in_keyring(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name))
        .map_err(|e| ConfigError::Keyring(format!("failed to access keyring: {e}")))?;
    entry
        .set_password(token)
        .map_err(|e| ConfigError::Keyring(format!("failed to store token: {e}")))
}

// ── Profile → DashboardConfig ───────────────────────────────────────

/// Parse and validate a base URL.
pub fn parse_base_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.trim().parse().map_err(|_| ConfigError::Validation {
        field: "base_url".into(),
        reason: format!("invalid URL: '{raw}'"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("expected http or https, got '{}'", url.scheme()),
        });
    }
    Ok(url)
}

/// Build a `DashboardConfig` from a profile, no CLI flag overrides.
pub fn profile_to_dashboard_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<DashboardConfig, ConfigError> {
    let mut config = DashboardConfig::new(parse_base_url(&profile.base_url)?);

    config.token = resolve_token(profile, profile_name);
    if config.token.is_none() {
        debug!(profile = profile_name, "no bearer token configured");
    }

    config.tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.fast_interval = Duration::from_secs(
        profile
            .fast_interval_secs
            .unwrap_or(defaults.fast_interval_secs),
    );
    config.slow_interval = Duration::from_secs(
        profile
            .slow_interval_secs
            .unwrap_or(defaults.slow_interval_secs),
    );

    if let Some(limit) = profile.page_limit {
        if limit == 0 {
            return Err(ConfigError::Validation {
                field: "page_limit".into(),
                reason: "must be at least 1".into(),
            });
        }
        config.page_limit = limit;
    }
    if let Some(len) = profile.series_len {
        if len == 0 {
            return Err(ConfigError::Validation {
                field: "series_len".into(),
                reason: "must be at least 1".into(),
            });
        }
        config.series_len = len;
    }

    config.endpoints = profile.endpoints.clone();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn token_of(secret: Option<SecretString>) -> Option<String> {
        secret.map(|s| s.expose_secret().to_owned())
    }

    #[test]
    fn token_env_wins_over_everything() {
        let profile = Profile {
            token: Some("plain".into()),
            token_env: Some("MY_TOKEN".into()),
            ..Profile::new("https://crm.test")
        };
        let env = |name: &str| match name {
            "MY_TOKEN" => Some("from-profile-env".to_owned()),
            TOKEN_ENV => Some("from-global-env".to_owned()),
            _ => None,
        };
        let token = resolve_token_from(&profile, "default", env, |_| Some("from-keyring".into()));
        assert_eq!(token_of(token).as_deref(), Some("from-profile-env"));
    }

    #[test]
    fn keyring_wins_over_plaintext() {
        let profile = Profile {
            token: Some("plain".into()),
            ..Profile::new("https://crm.test")
        };
        let token = resolve_token_from(&profile, "staging", |_| None, |user| {
            (user == "staging/token").then(|| "from-keyring".to_owned())
        });
        assert_eq!(token_of(token).as_deref(), Some("from-keyring"));
    }

    #[test]
    fn plaintext_is_last_resort_and_blank_is_none() {
        let mut profile = Profile {
            token: Some("plain".into()),
            ..Profile::new("https://crm.test")
        };
        let token = resolve_token_from(&profile, "default", |_| None, |_| None);
        assert_eq!(token_of(token).as_deref(), Some("plain"));

        profile.token = Some("   ".into());
        assert!(resolve_token_from(&profile, "default", |_| None, |_| None).is_none());
    }

    #[test]
    fn load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "prod"

[defaults]
timeout = 12

[profiles.prod]
base_url = "https://crm.example.com"
page_limit = 50

[profiles.prod.endpoints]
crm_stats = ""
"#,
        )
        .unwrap_or_else(|e| panic!("write: {e}"));

        let cfg = load_config_from(&path).unwrap_or_else(|e| panic!("load: {e}"));
        assert_eq!(cfg.default_profile.as_deref(), Some("prod"));
        assert_eq!(cfg.defaults.timeout, 12);
        assert_eq!(cfg.defaults.fast_interval_secs, 10);

        let prod = &cfg.profiles["prod"];
        assert_eq!(prod.page_limit, Some(50));
        assert_eq!(prod.endpoints.crm_stats, "");
        assert_eq!(prod.endpoints.leads, "/api/leads");
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert(
            "local".into(),
            Profile {
                slow_interval_secs: Some(0),
                ..Profile::new("http://localhost:5000")
            },
        );
        save_config_to(&cfg, &path).unwrap_or_else(|e| panic!("save: {e}"));

        let loaded = load_config_from(&path).unwrap_or_else(|e| panic!("load: {e}"));
        assert_eq!(loaded.profile_names(), ["local"]);
        assert_eq!(loaded.profiles["local"].slow_interval_secs, Some(0));
    }

    #[test]
    fn profile_translates_to_dashboard_config() {
        let profile = Profile {
            insecure: Some(true),
            timeout: Some(5),
            fast_interval_secs: Some(0),
            series_len: Some(12),
            ..Profile::new("https://crm.example.com/backend")
        };
        let config = profile_to_dashboard_config(&profile, "t", &Defaults::default())
            .unwrap_or_else(|e| panic!("config: {e}"));

        assert_eq!(config.base_url.as_str(), "https://crm.example.com/backend");
        assert_eq!(config.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.fast_interval.is_zero());
        assert_eq!(config.slow_interval, Duration::from_secs(15));
        assert_eq!(config.series_len, 12);
        assert_eq!(config.page_limit, 100);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad_url = Profile::new("crm.example.com");
        assert!(matches!(
            profile_to_dashboard_config(&bad_url, "t", &Defaults::default()),
            Err(ConfigError::Validation { ref field, .. }) if field == "base_url"
        ));

        let zero_limit = Profile {
            page_limit: Some(0),
            ..Profile::new("https://crm.example.com")
        };
        assert!(matches!(
            profile_to_dashboard_config(&zero_limit, "t", &Defaults::default()),
            Err(ConfigError::Validation { ref field, .. }) if field == "page_limit"
        ));

        assert!(parse_base_url("ftp://crm.example.com").is_err());
    }
}
