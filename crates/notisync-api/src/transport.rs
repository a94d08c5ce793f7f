// Shared transport configuration for building reqwest::Client instances.
//
// The REST client and anything else that talks HTTP to the notification
// server share timeout and user-agent settings through this module.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};

const USER_AGENT: &str = concat!("notisync/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Extra default headers applied to every request.
    pub headers: HeaderMap,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            headers: HeaderMap::new(),
        }
    }
}

impl TransportConfig {
    /// Config with a custom request timeout and default headers.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut headers = self.headers.clone();
        headers
            .entry(ACCEPT)
            .or_insert(HeaderValue::from_static("application/json"));

        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(crate::error::Error::Transport)
    }
}
