//! Config subcommand handlers.

use dialoguer::{Input, Password, Select};
use secrecy::SecretString;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of `cfg` with plaintext tokens masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.token.is_some() {
            profile.token = Some(REDACTED.into());
        }
    }
    cfg
}

/// Format config for display. Tokens must already be masked.
fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "page_size = {}", cfg.defaults.page_size);

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "api_url = \"{}\"", p.api_url);
        if let Some(ref url) = p.push_url {
            let _ = writeln!(out, "push_url = \"{url}\"");
        }
        if let Some(ref token) = p.token {
            let _ = writeln!(out, "token = \"{token}\"");
        }
        if let Some(ref env) = p.token_env {
            let _ = writeln!(out, "token_env = \"{env}\"");
        }
        let knobs = [
            ("timeout", p.timeout),
            ("handshake_timeout", p.handshake_timeout),
            ("heartbeat_interval", p.heartbeat_interval),
            ("heartbeat_timeout", p.heartbeat_timeout),
            ("reconnect_base_delay_ms", p.reconnect_base_delay_ms),
            ("reconnect_max_delay", p.reconnect_max_delay),
            (
                "reconnect_max_attempts",
                p.reconnect_max_attempts.map(u64::from),
            ),
            ("quick_check_interval", p.quick_check_interval),
            ("full_refresh_interval", p.full_refresh_interval),
            ("page_size", p.page_size.map(u64::from)),
        ];
        for (key, value) in knobs.into_iter().filter_map(|(k, v)| v.map(|v| (k, v))) {
            let _ = writeln!(out, "{key} = {value}");
        }
    }

    out.trim_end().to_owned()
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_token() -> Result<String, CliError> {
    let token = Password::new()
        .with_prompt("Bearer token")
        .interact()
        .map_err(prompt_err)?;
    non_empty_token(token)
}

fn non_empty_token(token: String) -> Result<String, CliError> {
    let token = token.trim().to_owned();
    if token.is_empty() {
        return Err(CliError::Validation {
            field: "token".into(),
            reason: "token cannot be empty".into(),
        });
    }
    Ok(token)
}

/// Offer to store the token in the system keyring or return it for
/// plaintext config.
///
/// Returns `Some(token)` if the user chose plaintext, `None` if stored in
/// the keyring.
fn prompt_token_storage(token: String, profile_name: &str) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the token?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        notisync_config::store_token(profile_name, &SecretString::from(token))?;
        eprintln!("   ✓ Token stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(token))
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load()?;
            let present = config::presentation(global, &cfg);
            let out = output::render_single(present.format, &redacted(&cfg), format_config, |_| {
                config::config_path().display().to_string()
            })?;
            output::print_output(&out, present.quiet);
            Ok(())
        }

        ConfigCommand::Init => init(global),

        ConfigCommand::SetToken { value } => {
            let cfg = config::load()?;
            let profile_name = config::active_profile_name(global, &cfg);
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    name: profile_name,
                    available: config::available_profiles(&cfg),
                });
            }

            let token = match value {
                Some(token) => non_empty_token(token)?,
                None => prompt_token()?,
            };
            notisync_config::store_token(&profile_name, &SecretString::from(token))?;

            let present = config::presentation(global, &cfg);
            if !present.quiet {
                eprintln!(
                    "{}",
                    output::success(
                        &format!("Token for profile '{profile_name}' stored in system keyring"),
                        present.color,
                    )
                );
            }
            Ok(())
        }
    }
}

/// Interactive wizard: one profile, written as the default.
fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("notisync configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    // Keep any existing profiles; the new one becomes the default.
    let mut cfg = config::load()?;

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default(global.profile.clone().unwrap_or_else(|| "default".into()))
        .interact_text()
        .map_err(prompt_err)?;

    let api_url: String = Input::new()
        .with_prompt("API URL")
        .default(
            global
                .api_url
                .clone()
                .unwrap_or_else(|| "https://localhost:3000/api".into()),
        )
        .validate_with(|raw: &String| -> Result<(), String> {
            url::Url::parse(raw).map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()
        .map_err(prompt_err)?;

    let push_url: String = Input::new()
        .with_prompt("Push URL (empty to derive from the API URL)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;

    let token = prompt_token()?;
    let token = prompt_token_storage(token, &profile_name)?;

    let mut profile = Profile::new(api_url);
    profile.push_url = Some(push_url.trim().to_owned()).filter(|u| !u.is_empty());
    profile.token = token;

    // Reject values the engine would refuse before writing them out.
    notisync_config::profile_to_engine_config(&profile, &cfg.defaults)?;

    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    let path = notisync_config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: notisync list");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_masks_plaintext_tokens() {
        let mut cfg = Config::default();
        let mut profile = Profile::new("https://api.example.com/api");
        profile.token = Some("secret-token".into());
        profile.page_size = Some(25);
        cfg.profiles.insert("work".into(), profile);

        let text = format_config(&redacted(&cfg));
        assert!(!text.contains("secret-token"));
        assert!(text.contains("token = \"****\""));
        assert!(text.contains("[profiles.work]"));
        assert!(text.contains("page_size = 25"));
    }

    #[test]
    fn blank_tokens_are_rejected() {
        assert!(non_empty_token("   ".into()).is_err());
        assert_eq!(non_empty_token(" abc \n".into()).unwrap_or_default(), "abc");
    }
}
