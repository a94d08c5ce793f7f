// ── Core error types ──
//
// Errors surfaced by the sync engine. Consumers never see reqwest or
// tungstenite errors directly: the `From<notisync_api::Error>` impl
// translates wire-level failures into engine-level variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach notification server{}: {reason}", at_url(.url.as_deref()))]
    ConnectionFailed { url: Option<String>, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Notification not found: {id}")]
    NotFound { id: String },

    #[error("Malformed `{event}` event: {message}")]
    MalformedEvent { event: String, message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the credential itself was refused.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }
}

fn at_url(url: Option<&str>) -> String {
    url.map(|u| format!(" at {u}")).unwrap_or_default()
}

// ── Conversion from wire-layer errors ────────────────────────────────

impl From<notisync_api::Error> for CoreError {
    fn from(err: notisync_api::Error) -> Self {
        use notisync_api::Error as ApiError;

        match err {
            ApiError::Unauthorized { message } => CoreError::AuthenticationFailed { message },
            ApiError::MissingCredential => CoreError::AuthenticationFailed {
                message: "No credential available -- log in first".into(),
            },
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e.url().map(ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Http { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            ApiError::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            ApiError::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: None,
                reason: format!("WebSocket connection failed: {reason}"),
            },
            ApiError::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: None,
                reason: format!("WebSocket closed (code {code}): {reason}"),
            },
            ApiError::HandshakeTimeout { .. } | ApiError::HeartbeatTimeout { .. } => {
                CoreError::Timeout
            }
            ApiError::Encode(e) => CoreError::Internal(format!("Failed to encode frame: {e}")),
        }
    }
}
