//! Persistent configuration for notisync.
//!
//! TOML profiles with an environment overlay, bearer-token resolution
//! (env var, system keyring, plaintext), and translation to
//! `notisync_core::EngineConfig`. The core never reads files; this crate
//! is the only place that does.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use notisync_core::{EngineConfig, HeartbeatPolicy};

/// Prefix of every environment override (`NOTISYNC_DEFAULTS__PAGE_SIZE`).
pub const ENV_PREFIX: &str = "NOTISYNC_";
/// Token fallback consulted after a profile's `token_env`.
pub const TOKEN_ENV: &str = "NOTISYNC_TOKEN";
/// Overrides the config file location.
pub const CONFIG_ENV: &str = "NOTISYNC_CONFIG";

const KEYRING_SERVICE: &str = "notisync";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

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
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// `requested`, else the configured default, else `"default"`.
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            page_size: default_page_size(),
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
fn default_page_size() -> u32 {
    10
}

/// A named notification server. Durations are whole seconds unless the
/// field name says otherwise; unset knobs keep the engine defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// REST API root (e.g., "https://api.example.com/api").
    pub api_url: String,

    /// Push endpoint. Derived from `api_url` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_url: Option<String>,

    /// Bearer token (plaintext -- prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable holding the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handshake_timeout: Option<u64>,

    /// `0` disables the heartbeat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_interval: Option<u64>,

    /// Drop the session after this long without a heartbeat response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_base_delay_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_max_delay: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_max_attempts: Option<u32>,

    /// `0` disables the quick-check probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_check_interval: Option<u64>,

    /// `0` disables the fallback refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_refresh_interval: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl Profile {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// `$NOTISYNC_CONFIG`, else the platform config dir.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("dev", "notisync", "notisync").map_or_else(
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
    p.push("notisync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then the TOML file at `path` (if present), then
/// `NOTISYNC_*` variables with `__` as the nesting separator.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(
            Env::prefixed(ENV_PREFIX)
                .ignore(&["token", "config", "profile"])
                .split("__"),
        );

    Ok(figment.extract()?)
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(&path, cfg)?;
    Ok(path)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

/// Keyring entry name for a profile's token.
pub fn token_entry_name(profile_name: &str) -> String {
    format!("{profile_name}/token")
}

/// Resolve the bearer token: `token_env`, `NOTISYNC_TOKEN`, system
/// keyring, then plaintext.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_token_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        keyring_token,
    )
}

/// Resolution with injectable lookups.
pub fn resolve_token_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    if let Some(token) = profile.token_env.as_deref().and_then(&env) {
        return Ok(SecretString::from(token));
    }
    if let Some(token) = env(TOKEN_ENV) {
        return Ok(SecretString::from(token));
    }
    if let Some(token) = keyring(profile_name) {
        return Ok(SecretString::from(token));
    }
    if let Some(token) = &profile.token {
        return Ok(SecretString::from(token.clone()));
    }
    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

fn keyring_token(profile_name: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &token_entry_name(profile_name))
        .ok()?
        .get_password()
        .ok()
}

/// Save a profile's token in the system keyring.
pub fn store_token(profile_name: &str, token: &SecretString) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &token_entry_name(profile_name))?;
    entry.set_password(token.expose_secret())?;
    Ok(())
}

// ── EngineConfig translation ────────────────────────────────────────

/// Build an `EngineConfig` from a profile, with `defaults` filling the
/// knobs the profile leaves unset.
pub fn profile_to_engine_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<EngineConfig, ConfigError> {
    let api_url = parse_url("api_url", &profile.api_url)?;
    let mut config = EngineConfig::new(api_url);

    config.push_url = profile
        .push_url
        .as_deref()
        .map(|raw| parse_url("push_url", raw))
        .transpose()?;

    config.request_timeout = secs(profile.timeout.unwrap_or(defaults.timeout));
    if let Some(t) = profile.handshake_timeout {
        config.handshake_timeout = secs(t);
    }

    config.heartbeat = HeartbeatPolicy {
        interval: profile
            .heartbeat_interval
            .map_or(config.heartbeat.interval, secs),
        timeout: profile.heartbeat_timeout.map(secs),
    };

    if let Some(ms) = profile.reconnect_base_delay_ms {
        config.reconnect.base_delay = Duration::from_millis(ms);
    }
    if let Some(max) = profile.reconnect_max_delay {
        config.reconnect.max_delay = secs(max);
    }
    if let Some(attempts) = profile.reconnect_max_attempts {
        config.reconnect.max_attempts = attempts;
    }
    if config.reconnect.base_delay > config.reconnect.max_delay {
        return Err(ConfigError::Validation {
            field: "reconnect_base_delay_ms".into(),
            reason: "must not exceed reconnect_max_delay".into(),
        });
    }

    if let Some(t) = profile.quick_check_interval {
        config.quick_check_interval = secs(t);
    }
    if let Some(t) = profile.full_refresh_interval {
        config.full_refresh_interval = secs(t);
    }

    config.page_size = profile.page_size.unwrap_or(defaults.page_size);
    if config.page_size == 0 {
        return Err(ConfigError::Validation {
            field: "page_size".into(),
            reason: "must be at least 1".into(),
        });
    }

    Ok(config)
}

fn parse_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}
