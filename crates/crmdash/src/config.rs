//! CLI flag overrides on top of `crmdash-config` profiles.
//!
//! The profile file and credential chain live in `crmdash-config`; this
//! module layers `--base-url`, `--token`, `--insecure`, and `--timeout`
//! over the resolved profile and hands core a finished `DashboardConfig`.

use std::time::Duration;

use secrecy::SecretString;

use crmdash_config::{Config, Profile};
use crmdash_core::{DashboardConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use crmdash_config::{config_path, load_config_or_default, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `DashboardConfig` from the config file, profile, and CLI overrides.
///
/// Returns the active profile name alongside the config.
pub fn build_dashboard_config(
    global: &GlobalOpts,
) -> Result<(String, DashboardConfig), CliError> {
    let mut cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.remove(&profile_name) {
        Some(profile) => profile,
        // An explicitly requested profile must exist.
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: CliError::available_profiles(&cfg.profile_names()),
            });
        }
        // No profile: build from CLI flags / env vars alone.
        None => {
            let url = global.base_url.as_deref().ok_or_else(|| CliError::NoConfig {
                path: config_path().display().to_string(),
            })?;
            Profile::new(url)
        }
    };

    // Base URL (flag > env > profile)
    if let Some(ref url) = global.base_url {
        profile.base_url.clone_from(url);
    }

    let mut config =
        crmdash_config::profile_to_dashboard_config(&profile, &profile_name, &cfg.defaults)?;
    apply_overrides(&mut config, global);
    Ok((profile_name, config))
}

fn apply_overrides(config: &mut DashboardConfig, global: &GlobalOpts) {
    if let Some(token) = global.token.as_deref().filter(|t| !t.trim().is_empty()) {
        config.token = Some(SecretString::from(token.to_owned()));
    }
    if global.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs);
    }
}
