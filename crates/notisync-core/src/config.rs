// ── Runtime engine configuration ──
//
// These types describe *how* the engine talks to the notification server
// and how its timers are tuned. They never touch disk: the CLI (through
// `notisync-config`) constructs an `EngineConfig` and hands it in.

use std::time::Duration;

use url::Url;

use crate::error::CoreError;

// ── Reconnect policy ────────────────────────────────────────────────

/// Exponential backoff for push-channel reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry. Default: 1s.
    pub base_delay: Duration,
    /// Upper bound on any single delay. Default: 30s.
    pub max_delay: Duration,
    /// Retries allowed after a failure before giving up. Default: 10.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// Delay scheduled before retry number `attempt` (1-based):
    /// `min(base * 2^(attempt-1), max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1_u32 << exponent)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

// ── Heartbeat policy ────────────────────────────────────────────────

/// Ping cadence while the push channel is connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatPolicy {
    /// Ping interval. `Duration::ZERO` disables the heartbeat.
    pub interval: Duration,
    /// When set, a session with no heartbeat response for longer than this
    /// is treated as dropped. `None` keeps missed heartbeats informational.
    pub timeout: Option<Duration>,
}

impl Default for HeartbeatPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: None,
        }
    }
}

// ── EngineConfig ────────────────────────────────────────────────────

/// Everything the engine needs to run against one server.
///
/// Built by the CLI -- core never reads config files.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// REST API root (e.g., `https://api.example.com/api`).
    pub api_url: Url,
    /// Push endpoint. Derived from `api_url` when unset.
    pub push_url: Option<Url>,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Bound on a single push handshake.
    pub handshake_timeout: Duration,
    pub heartbeat: HeartbeatPolicy,
    pub reconnect: ReconnectPolicy,
    /// Quick-check probe cadence. `Duration::ZERO` disables it.
    pub quick_check_interval: Duration,
    /// Full refresh cadence while push is down. `Duration::ZERO` disables it.
    pub full_refresh_interval: Duration,
    /// Entries per page.
    pub page_size: u32,
}

impl EngineConfig {
    /// Defaults for every knob, against the given API root.
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            push_url: None,
            request_timeout: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(10),
            heartbeat: HeartbeatPolicy::default(),
            reconnect: ReconnectPolicy::default(),
            quick_check_interval: Duration::from_secs(10),
            full_refresh_interval: Duration::from_secs(30),
            page_size: 10,
        }
    }

    /// The configured push URL, or the one derived from the API root.
    pub fn resolved_push_url(&self) -> Result<Url, CoreError> {
        match &self.push_url {
            Some(url) => Ok(url.clone()),
            None => notisync_api::default_push_url(&self.api_url).map_err(|e| CoreError::Config {
                message: e.to_string(),
            }),
        }
    }
}
