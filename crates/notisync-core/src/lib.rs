//! Real-time notification sync engine built on `notisync-api`.
//!
//! Keeps a client-side inbox consistent with the server through a push
//! channel, with a polling fallback:
//!
//! - **[`TransportManager`]**: push-channel lifecycle. Handshake timeout,
//!   heartbeat, exponential-backoff reconnection, decoded
//!   [`ServerEvent`]s on a broadcast channel, and an observable
//!   [`ConnectionInfo`].
//!
//! - **[`Poller`]**: pull fallback. A quick-check probe that always runs
//!   and a full refresh that only runs while push is down.
//!
//! - **[`Synchronizer`]**: the canonical store. Paginated, filterable,
//!   idempotent under duplicate or reordered events, with stale page
//!   responses discarded by a request generation counter. Publishes
//!   [`SyncState`] snapshots through [`StateStream`].
//!
//! - **[`Engine`]**: wires the three together and follows the
//!   [`CredentialSource`] signal through login and logout.

pub mod config;
pub mod convert;
pub mod credential;
pub mod engine;
pub mod error;
pub mod event;
pub mod model;
pub mod poller;
pub mod store;
pub mod stream;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{EngineConfig, HeartbeatPolicy, ReconnectPolicy};
pub use credential::CredentialSource;
pub use engine::{Engine, EngineStats, LiveEngine};
pub use error::CoreError;
pub use event::{Change, ServerEvent};
pub use poller::Poller;
pub use store::{LoadOutcome, SyncState, Synchronizer};
pub use stream::{StateStream, StateWatchStream};
pub use transport::{ConnectionInfo, ConnectionState, TransportManager};

pub use model::{
    Category, FilterPatch, Notification, NotificationFilter, NotificationId, Priority, ReadStatus,
};

// The wire-level credential is part of the engine's public surface.
pub use notisync_api::Credential;
