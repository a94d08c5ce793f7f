//! WebSocket implementation of the push channel.
//!
//! Opens an authenticated WebSocket to the notification server and exchanges
//! JSON `{event, data}` text frames. Reconnection is not handled here: a
//! [`WsSession`] is one connection, and the engine's transport manager owns
//! retry policy.
//!
//! # Example
//!
//! ```rust,ignore
//! use notisync_api::{Credential, PushConnector, PushSession, WsConnector};
//!
//! let connector = WsConnector::new("wss://api.example.com/socket".parse()?);
//! let mut session = connector.open(&Credential::new(token)).await?;
//!
//! while let Some(frame) = session.recv().await {
//!     let frame = frame?;
//!     println!("{}: {}", frame.event, frame.data);
//! }
//! ```

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::credential::Credential;
use crate::error::Error;
use crate::push::{PushConnector, PushFrame, PushSession};

// ── Connector ────────────────────────────────────────────────────────

/// Opens [`WsSession`]s against a fixed endpoint.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: Url,
}

impl WsConnector {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl PushConnector for WsConnector {
    type Session = WsSession;

    async fn open(&self, credential: &Credential) -> Result<WsSession, Error> {
        tracing::info!(url = %self.url, "Connecting to push channel");

        let uri: tungstenite::http::Uri = self.url.as_str().parse().map_err(
            |e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()),
        )?;

        let request =
            ClientRequestBuilder::new(uri).with_header("Authorization", credential.bearer());

        let (stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(map_handshake_error)?;

        tracing::info!("Push channel connected");
        Ok(WsSession { stream })
    }
}

/// A refused upgrade with 401/403 is a credential rejection, not a
/// transport failure.
fn map_handshake_error(err: tungstenite::Error) -> Error {
    if let tungstenite::Error::Http(resp) = &err {
        let status = resp.status();
        if status == tungstenite::http::StatusCode::UNAUTHORIZED
            || status == tungstenite::http::StatusCode::FORBIDDEN
        {
            return Error::Unauthorized {
                message: format!("push handshake rejected with {status}"),
            };
        }
    }
    Error::WebSocketConnect(err.to_string())
}

// ── Session ──────────────────────────────────────────────────────────

/// One live WebSocket connection.
pub struct WsSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl PushSession for WsSession {
    async fn recv(&mut self) -> Option<Result<PushFrame, Error>> {
        loop {
            match self.stream.next().await? {
                Ok(tungstenite::Message::Text(text)) => {
                    if let Some(frame) = parse_frame(&text) {
                        return Some(Ok(frame));
                    }
                }
                Ok(tungstenite::Message::Pong(_)) => return Some(Ok(PushFrame::pong())),
                Ok(tungstenite::Message::Ping(_)) => {
                    // tungstenite queues the pong reply itself
                    tracing::trace!("WebSocket ping");
                }
                Ok(tungstenite::Message::Close(frame)) => {
                    if let Some(cf) = frame {
                        tracing::info!(
                            code = %cf.code,
                            reason = %cf.reason,
                            "WebSocket close frame received"
                        );
                    } else {
                        tracing::info!("WebSocket close frame received (no payload)");
                    }
                    return None;
                }
                Ok(_) => {
                    // Binary, raw Frame -- ignore
                }
                Err(e) => return Some(Err(Error::WebSocketConnect(e.to_string()))),
            }
        }
    }

    async fn send(&mut self, frame: PushFrame) -> Result<(), Error> {
        let text = serde_json::to_string(&frame)?;
        self.stream
            .send(tungstenite::Message::text(text))
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "WebSocket close failed");
        }
    }
}

// ── Message parsing ──────────────────────────────────────────────────

/// Parse a text frame; anything that is not an `{event, data}` envelope is
/// logged and skipped.
fn parse_frame(text: &str) -> Option<PushFrame> {
    match serde_json::from_str::<PushFrame>(text) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to parse push frame");
            None
        }
    }
}

// ── URL derivation ───────────────────────────────────────────────────

/// Default push endpoint for an API root: same host, `ws(s)` scheme,
/// path `/socket`.
pub fn default_push_url(api_url: &Url) -> Result<Url, Error> {
    let mut url = api_url.clone();
    let scheme = match api_url.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::WebSocketConnect(format!("cannot derive push URL from {api_url}")))?;
    url.set_path("/socket");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

// ── Tests ────────────────────────────────────────────────────────────
