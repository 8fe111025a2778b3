//! Config subcommand handlers.

use std::str::FromStr;

use dialoguer::{Input, Select};

use crmdash_config::{Config, Profile};
use crmdash_core::Endpoints;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "fast_interval_secs = {}", cfg.defaults.fast_interval_secs);
    let _ = writeln!(out, "slow_interval_secs = {}", cfg.defaults.slow_interval_secs);

    for name in cfg.profile_names() {
        let Some(p) = cfg.profiles.get(name) else {
            continue;
        };
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "base_url = \"{}\"", p.base_url);
        if p.token.is_some() {
            let _ = writeln!(out, "token = \"{REDACTED}\"");
        }
        if let Some(ref env) = p.token_env {
            let _ = writeln!(out, "token_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(fast) = p.fast_interval_secs {
            let _ = writeln!(out, "fast_interval_secs = {fast}");
        }
        if let Some(slow) = p.slow_interval_secs {
            let _ = writeln!(out, "slow_interval_secs = {slow}");
        }
        if let Some(limit) = p.page_limit {
            let _ = writeln!(out, "page_limit = {limit}");
        }
        if let Some(len) = p.series_len {
            let _ = writeln!(out, "series_len = {len}");
        }
        if p.endpoints != Endpoints::default() {
            let _ = writeln!(out, "[profiles.{name}.endpoints]");
            for (key, path) in endpoint_fields(&p.endpoints) {
                let _ = writeln!(out, "{key} = \"{path}\"");
            }
        }
    }

    out
}

fn endpoint_fields(e: &Endpoints) -> [(&'static str, &str); 10] {
    [
        ("leads", e.leads.as_str()),
        ("users", e.users.as_str()),
        ("colleges", e.colleges.as_str()),
        ("trainers", e.trainers.as_str()),
        ("blogs", e.blogs.as_str()),
        ("videos", e.videos.as_str()),
        ("courses", e.courses.as_str()),
        ("crm_stats", e.crm_stats.as_str()),
        ("crm_chart", e.crm_chart.as_str()),
        ("cms_chart", e.cms_chart.as_str()),
    ]
}

fn endpoint_mut<'a>(e: &'a mut Endpoints, key: &str) -> Option<&'a mut String> {
    Some(match key {
        "leads" => &mut e.leads,
        "users" => &mut e.users,
        "colleges" => &mut e.colleges,
        "trainers" => &mut e.trainers,
        "blogs" => &mut e.blogs,
        "videos" => &mut e.videos,
        "courses" => &mut e.courses,
        "crm_stats" => &mut e.crm_stats,
        "crm_chart" => &mut e.crm_chart,
        "cms_chart" => &mut e.cms_chart,
        _ => return None,
    })
}

/// Replace every stored secret before structured output.
fn redact(cfg: &mut Config) {
    for profile in cfg.profiles.values_mut() {
        if profile.token.is_some() {
            profile.token = Some(REDACTED.into());
        }
    }
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn parse_value<T: FromStr>(field: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value.trim().parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("must be {expected}"),
    })
}

fn parse_at_least_one<T: FromStr + PartialOrd + From<u8>>(
    field: &str,
    value: &str,
) -> Result<T, CliError> {
    let parsed: T = parse_value(field, value, "a positive number")?;
    if parsed < T::from(1) {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "must be at least 1".into(),
        });
    }
    Ok(parsed)
}

/// Apply `key = value` to a profile.
fn set_profile_value(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "base_url" | "base-url" => {
            crmdash_config::parse_base_url(&value)?;
            profile.base_url = value;
        }
        "token" => profile.token = Some(value),
        "token_env" | "token-env" => profile.token_env = Some(value),
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "insecure" => profile.insecure = Some(parse_value(key, &value, "'true' or 'false'")?),
        "timeout" => profile.timeout = Some(parse_value(key, &value, "a number (seconds)")?),
        "fast_interval_secs" => {
            profile.fast_interval_secs = Some(parse_value(key, &value, "a number (seconds)")?);
        }
        "slow_interval_secs" => {
            profile.slow_interval_secs = Some(parse_value(key, &value, "a number (seconds)")?);
        }
        "page_limit" => profile.page_limit = Some(parse_at_least_one(key, &value)?),
        "series_len" => profile.series_len = Some(parse_at_least_one(key, &value)?),
        other => {
            let endpoint = other
                .strip_prefix("endpoints.")
                .and_then(|name| endpoint_mut(&mut profile.endpoints, name));
            let Some(slot) = endpoint else {
                return Err(CliError::Validation {
                    field: other.into(),
                    reason: format!(
                        "unknown config key '{other}'. Valid keys: base_url, token, token_env, \
                         ca_cert, insecure, timeout, fast_interval_secs, slow_interval_secs, \
                         page_limit, series_len, endpoints.<source>"
                    ),
                });
            };
            *slot = value;
        }
    }
    Ok(())
}

fn profile_not_found(cfg: &Config, name: String) -> CliError {
    CliError::ProfileNotFound {
        name,
        available: CliError::available_profiles(&cfg.profile_names()),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let mut cfg = config::load_config_or_default();
            let out = if global.output == OutputFormat::Table {
                format_config_redacted(&cfg)
            } else {
                redact(&mut cfg);
                output::render_structured(global.output, &cfg)?
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);

            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_profile_value(profile, &key, value)?;

            config::save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            let names = cfg.profile_names();
            if names.is_empty() {
                eprintln!("No profiles configured. Run: crmdash config init");
            } else {
                let listing: Vec<String> = names
                    .iter()
                    .map(|name| {
                        let marker = if *name == default { " *" } else { "" };
                        format!("{name}{marker}")
                    })
                    .collect();
                output::print_output(&listing.join("\n"), global.quiet);
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(profile_not_found(&cfg, name));
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetToken ────────────────────────────────────────────────
        ConfigCommand::SetToken { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(profile_not_found(&cfg, profile_name));
            }

            let token = rpassword::prompt_password("Bearer token: ").map_err(prompt_err)?;
            if token.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "token cannot be empty".into(),
                });
            }
            crmdash_config::store_token_in_keyring(&profile_name, token.trim())?;

            eprintln!("✓ Token stored in system keyring for profile '{profile_name}'");
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}

/// Interactive wizard writing a fresh config with one profile.
fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("crmdash configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    // 1. Profile name
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    // 2. Backend URL
    let base_url: String = Input::new()
        .with_prompt("Backend base URL")
        .default("http://localhost:3000".into())
        .validate_with(|input: &String| {
            crmdash_config::parse_base_url(input)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()
        .map_err(prompt_err)?;

    let mut profile = Profile::new(base_url);

    // 3. Bearer token
    let choices = &[
        "Store in system keyring (recommended)",
        "Read from an environment variable",
        "Save to config file (plaintext)",
        "No token (public endpoints)",
    ];
    let selection = Select::new()
        .with_prompt("Bearer token")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    match selection {
        0 | 2 => {
            let token = rpassword::prompt_password("Bearer token: ").map_err(prompt_err)?;
            let token = token.trim();
            if token.is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "token cannot be empty".into(),
                });
            }
            if selection == 0 {
                crmdash_config::store_token_in_keyring(&profile_name, token)?;
                eprintln!("   ✓ Token stored in system keyring");
            } else {
                profile.token = Some(token.to_owned());
            }
        }
        1 => {
            let var: String = Input::new()
                .with_prompt("Environment variable name")
                .default(crmdash_config::TOKEN_ENV.into())
                .interact_text()
                .map_err(prompt_err)?;
            profile.token_env = Some(var);
        }
        _ => {}
    }

    // 4. Write config, keeping other profiles
    let mut cfg = config::load_config_or_default();
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: crmdash summary");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_validates_and_applies_values() {
        let mut profile = Profile::default();

        assert!(set_profile_value(&mut profile, "base_url", "https://crm.example.com".into()).is_ok());
        assert!(set_profile_value(&mut profile, "page_limit", "50".into()).is_ok());
        assert!(set_profile_value(&mut profile, "endpoints.crm_stats", String::new()).is_ok());

        assert_eq!(profile.base_url, "https://crm.example.com");
        assert_eq!(profile.page_limit, Some(50));
        assert!(profile.endpoints.crm_stats.is_empty());
    }

    #[test]
    fn set_rejects_bad_values() {
        let mut profile = Profile::default();

        assert!(set_profile_value(&mut profile, "base_url", "ftp://x".into()).is_err());
        assert!(set_profile_value(&mut profile, "page_limit", "0".into()).is_err());
        assert!(set_profile_value(&mut profile, "series_len", "many".into()).is_err());
        assert!(set_profile_value(&mut profile, "endpoints.nope", "/x".into()).is_err());
        assert!(set_profile_value(&mut profile, "colour", "red".into()).is_err());
    }

    #[test]
    fn redacted_display_hides_tokens() {
        let mut cfg = Config::default();
        let mut profile = Profile::new("https://crm.example.com");
        profile.token = Some("secret-token".into());
        profile.endpoints.cms_chart = String::new();
        cfg.profiles.insert("prod".into(), profile);

        let text = format_config_redacted(&cfg);
        assert!(!text.contains("secret-token"));
        assert!(text.contains("token = \"****\""));
        assert!(text.contains("[profiles.prod.endpoints]"));

        redact(&mut cfg);
        let token = cfg.profiles.get("prod").and_then(|p| p.token.as_deref());
        assert_eq!(token, Some(REDACTED));
    }
}
