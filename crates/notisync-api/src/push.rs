//! Push-channel seam.
//!
//! The sync engine only needs a duplex pipe of `{event, data}` frames; any
//! transport that can open one given a [`Credential`] plugs in through
//! [`PushConnector`]. [`WsConnector`](crate::websocket::WsConnector) is the
//! WebSocket implementation.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::credential::Credential;
use crate::error::Error;

/// Name of the client heartbeat event.
pub const PING_EVENT: &str = "ping";
/// Name of the heartbeat response event.
pub const PONG_EVENT: &str = "pong";

/// One message on the push channel, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushFrame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl PushFrame {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Heartbeat sent by the client.
    pub fn ping() -> Self {
        Self::new(PING_EVENT, serde_json::Value::Object(serde_json::Map::new()))
    }

    /// Heartbeat response, also synthesized from transport-level pongs.
    pub fn pong() -> Self {
        Self::new(PONG_EVENT, serde_json::Value::Null)
    }

    pub fn is_pong(&self) -> bool {
        self.event == PONG_EVENT
    }
}

/// Opens push sessions.
pub trait PushConnector: Send + Sync + 'static {
    type Session: PushSession;

    /// Perform the handshake. Resolves once the channel is usable.
    ///
    /// An [`Error::Unauthorized`] result means the credential was refused
    /// and retrying with it is pointless.
    fn open(&self, credential: &Credential)
    -> impl Future<Output = Result<Self::Session, Error>> + Send;
}

/// An established duplex session.
pub trait PushSession: Send + 'static {
    /// Next inbound frame. `None` means the peer closed cleanly.
    fn recv(&mut self) -> impl Future<Output = Option<Result<PushFrame, Error>>> + Send;

    /// Send one frame.
    fn send(&mut self, frame: PushFrame) -> impl Future<Output = Result<(), Error>> + Send;

    /// Close the session. Errors are swallowed; the session is gone either way.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_serializes_as_event_envelope() {
        let json = serde_json::to_value(PushFrame::ping()).unwrap();
        assert_eq!(json, serde_json::json!({ "event": "ping", "data": {} }));
    }

    #[test]
    fn frame_without_data_decodes() {
        let frame: PushFrame = serde_json::from_str(r#"{"event":"pong"}"#).unwrap();
        assert!(frame.is_pong());
        assert!(frame.data.is_null());
    }
}
