//! CLI configuration: thin wrapper around `notisync_config`.
//!
//! Adds the resolution steps that respect `GlobalOpts` overrides
//! (`--api-url`, `--token`, `--timeout`, `--output`, `--color`).

use clap::ValueEnum;
use secrecy::SecretString;

use notisync_core::EngineConfig;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use notisync_config::{Config, Defaults, Profile, config_path};

/// Everything a network command needs.
pub struct Session {
    pub profile_name: String,
    pub engine: EngineConfig,
    pub token: SecretString,
}

/// How results are printed.
#[derive(Debug, Clone, Copy)]
pub struct Presentation {
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
}

/// Read the config file and environment overlay.
pub fn load() -> Result<Config, CliError> {
    Ok(notisync_config::load_config()?)
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Output settings: flags first, then `[defaults]`.
pub fn presentation(global: &GlobalOpts, config: &Config) -> Presentation {
    let format = global
        .output
        .or_else(|| OutputFormat::from_str(&config.defaults.output, true).ok())
        .unwrap_or(OutputFormat::Table);
    let color = global
        .color
        .or_else(|| ColorMode::from_str(&config.defaults.color, true).ok())
        .unwrap_or(ColorMode::Auto);

    Presentation {
        format,
        color: crate::output::should_color(color),
        quiet: global.quiet,
    }
}

/// Translate the active profile plus global flags into an engine config
/// and a bearer token. Flag values win over profile values.
pub fn resolve_session(global: &GlobalOpts, config: &Config) -> Result<Session, CliError> {
    let profile_name = active_profile_name(global, config);
    let mut profile = select_profile(global, config, &profile_name)?;

    if let Some(ref url) = global.api_url {
        profile.api_url.clone_from(url);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    let engine = notisync_config::profile_to_engine_config(&profile, &config.defaults)?;
    let token = match global.token {
        Some(ref token) => SecretString::from(token.clone()),
        None => notisync_config::resolve_token(&profile, &profile_name)?,
    };

    Ok(Session {
        profile_name,
        engine,
        token,
    })
}

/// The named profile, or an ad-hoc one when only `--api-url` is given.
fn select_profile(
    global: &GlobalOpts,
    config: &Config,
    profile_name: &str,
) -> Result<Profile, CliError> {
    if let Some(profile) = config.profiles.get(profile_name) {
        return Ok(profile.clone());
    }

    // An explicitly requested profile must exist.
    if global.profile.is_some() {
        return Err(CliError::ProfileNotFound {
            name: profile_name.into(),
            available: available_profiles(config),
        });
    }

    match global.api_url {
        Some(ref url) => Ok(Profile::new(url.clone())),
        None => Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        }),
    }
}

/// Comma-separated profile names for error help.
pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".to_owned()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
