use thiserror::Error;

/// Top-level error type for the `notisync-api` crate.
///
/// Covers every failure mode across both channels: the REST fetch and
/// mutation endpoints, and the push-channel handshake and session.
/// `notisync-core` maps these into engine-level errors and state flags.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The server rejected the bearer token (HTTP 401/403).
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// A request was attempted while no credential is available.
    #[error("No credential available -- log in first")]
    MissingCredential,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Non-success HTTP status that is not an auth rejection.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    // ── Push channel ────────────────────────────────────────────────
    /// WebSocket handshake or stream failure.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed by the server.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// The push handshake did not complete in time.
    #[error("Push handshake timed out after {timeout_ms}ms")]
    HandshakeTimeout { timeout_ms: u64 },

    /// No heartbeat response within the configured window.
    #[error("No heartbeat response for {silent_ms}ms")]
    HeartbeatTimeout { silent_ms: u64 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// An outbound frame could not be encoded.
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` if the credential itself was rejected, meaning a
    /// retry with the same token cannot succeed.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::MissingCredential)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::WebSocketConnect(_)
            | Self::WebSocketClosed { .. }
            | Self::HandshakeTimeout { .. }
            | Self::HeartbeatTimeout { .. } => true,
            _ => false,
        }
    }

    /// HTTP status code, if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Http { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_rejections_are_not_transient() {
        let err = Error::Unauthorized {
            message: "bad token".into(),
        };
        assert!(err.is_auth_rejected());
        assert!(!err.is_transient());
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Http {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(err.is_transient());
        assert!(!err.is_auth_rejected());

        let err = Error::Http {
            status: 404,
            message: "missing".into(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn handshake_timeout_is_transient() {
        assert!(Error::HandshakeTimeout { timeout_ms: 10_000 }.is_transient());
    }
}
