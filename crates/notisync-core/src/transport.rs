// ── Push transport manager ──
//
// Owns the lifecycle of the push channel: handshake, heartbeat, inbound
// event fan-out, outbound emission, and exponential-backoff reconnection.
// At most one session task runs at a time; every task carries an epoch so
// a superseded task can never publish state.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use notisync_api::{Credential, Error as ApiError, PushConnector, PushFrame, PushSession};

use crate::config::{EngineConfig, HeartbeatPolicy, ReconnectPolicy};
use crate::event::ServerEvent;

const EVENT_CHANNEL_CAPACITY: usize = 256;

// ── Connection state ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Observable snapshot of the push channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionInfo {
    pub state: ConnectionState,
    /// Failures since the last successful handshake.
    pub reconnect_attempts: u32,
    /// Delay until the scheduled retry, while one is pending.
    pub next_retry_in: Option<Duration>,
    /// The retry budget ran out. Cleared by the next `connect`.
    pub exhausted: bool,
    pub connected_at: Option<DateTime<Utc>>,
    /// Last heartbeat response in the current session.
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl ConnectionInfo {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

// ── TransportManager ─────────────────────────────────────────────────

/// Push-channel controller.
///
/// Cheaply cloneable via `Arc<TransportInner>`. `connect`, `disconnect`,
/// and `emit_to_server` never block: the session runs in a background
/// task and reports through [`state`](Self::state) and
/// [`events`](Self::events).
pub struct TransportManager<C: PushConnector> {
    inner: Arc<TransportInner<C>>,
}

impl<C: PushConnector> Clone for TransportManager<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct TransportInner<C> {
    connector: C,
    handshake_timeout: Duration,
    heartbeat: HeartbeatPolicy,
    reconnect: ReconnectPolicy,
    info: watch::Sender<ConnectionInfo>,
    events: broadcast::Sender<ServerEvent>,
    slot: Mutex<Slot>,
}

#[derive(Default)]
struct Slot {
    /// Bumped whenever the active session is replaced or stopped.
    epoch: u64,
    active: Option<ActiveSession>,
    /// Stopped tasks not yet joined.
    retired: Vec<JoinHandle<()>>,
}

struct ActiveSession {
    credential: Credential,
    cancel: CancellationToken,
    outbound: mpsc::UnboundedSender<PushFrame>,
    handle: JoinHandle<()>,
}

impl<C: PushConnector> TransportManager<C> {
    pub fn new(connector: C, config: &EngineConfig) -> Self {
        let (info, _) = watch::channel(ConnectionInfo::default());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(TransportInner {
                connector,
                handshake_timeout: config.handshake_timeout,
                heartbeat: config.heartbeat,
                reconnect: config.reconnect,
                info,
                events,
                slot: Mutex::new(Slot::default()),
            }),
        }
    }

    pub fn connector(&self) -> &C {
        &self.inner.connector
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start a push session for `credential`.
    ///
    /// A no-op while a session task for the same credential is alive
    /// (connecting, connected, or waiting to retry). A different
    /// credential replaces the running session.
    pub fn connect(&self, credential: Credential) {
        let mut slot = self.inner.lock();
        if let Some(active) = &slot.active {
            if active.credential == credential && !active.handle.is_finished() {
                debug!("push session already running for this credential");
                return;
            }
        }
        self.start_locked(&mut slot, credential);
    }

    /// Stop the session and any pending retry. Idempotent.
    pub fn disconnect(&self) {
        let mut slot = self.inner.lock();
        if stop_locked(&mut slot) {
            info!("push channel disconnected");
        }
        self.inner.info.send_if_modified(|info| {
            let next = ConnectionInfo {
                last_error: info.last_error.take(),
                ..ConnectionInfo::default()
            };
            let changed = *info != next;
            *info = next;
            changed
        });
    }

    /// Tear down the current session and start over with its credential,
    /// resetting the retry budget.
    pub fn reconnect(&self) {
        let mut slot = self.inner.lock();
        let Some(credential) = slot.active.as_ref().map(|a| a.credential.clone()) else {
            debug!("no push credential to reconnect with");
            return;
        };
        self.start_locked(&mut slot, credential);
    }

    /// Disconnect and wait for every session task to finish.
    pub async fn shutdown(&self) {
        self.disconnect();
        let handles = std::mem::take(&mut self.inner.lock().retired);
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "push session task failed");
            }
        }
        debug!("push transport shut down");
    }

    // ── Outbound ─────────────────────────────────────────────────────

    /// Queue an event for the server. Returns `false` (and sends nothing)
    /// unless the channel is connected.
    pub fn emit_to_server(&self, event: &str, data: serde_json::Value) -> bool {
        let slot = self.inner.lock();
        let connected = self.inner.info.borrow().is_connected();
        match &slot.active {
            Some(active) if connected => active.outbound.send(PushFrame::new(event, data)).is_ok(),
            _ => {
                trace!(event, "push channel not connected, dropping outbound event");
                false
            }
        }
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn info(&self) -> ConnectionInfo {
        self.inner.info.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.info.borrow().is_connected()
    }

    /// Subscribe to connection-state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionInfo> {
        self.inner.info.subscribe()
    }

    /// Subscribe to decoded inbound events.
    pub fn events(&self) -> broadcast::Receiver<ServerEvent> {
        self.inner.events.subscribe()
    }

    // ── Internals ────────────────────────────────────────────────────

    fn start_locked(&self, slot: &mut Slot, credential: Credential) {
        stop_locked(slot);
        slot.epoch += 1;
        let epoch = slot.epoch;

        let cancel = CancellationToken::new();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        self.inner.info.send_modify(|info| {
            *info = ConnectionInfo {
                state: ConnectionState::Connecting,
                ..ConnectionInfo::default()
            };
        });

        let inner = Arc::clone(&self.inner);
        let task_cancel = cancel.clone();
        let task_credential = credential.clone();
        let handle = tokio::spawn(async move {
            run_session(inner, epoch, task_credential, task_cancel, outbound_rx).await;
        });

        slot.active = Some(ActiveSession {
            credential,
            cancel,
            outbound,
            handle,
        });
    }
}

/// Cancel the active session, if any. Returns whether one was running.
fn stop_locked(slot: &mut Slot) -> bool {
    slot.epoch += 1;
    slot.retired.retain(|h| !h.is_finished());
    match slot.active.take() {
        Some(active) => {
            active.cancel.cancel();
            slot.retired.push(active.handle);
            true
        }
        None => false,
    }
}

impl<C> TransportInner<C> {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().expect("transport slot lock poisoned")
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.lock().epoch == epoch
    }

    /// Apply `f` to the published info if `epoch` still owns the slot.
    fn publish(&self, epoch: u64, f: impl FnOnce(&mut ConnectionInfo)) {
        let slot = self.lock();
        if slot.epoch == epoch {
            self.info.send_modify(f);
        }
    }

    fn dispatch(&self, epoch: u64, frame: &PushFrame) {
        match ServerEvent::from_frame(frame) {
            Ok(Some(event)) => {
                if !self.is_current(epoch) {
                    return;
                }
                debug!(event = %frame.event, "push event received");
                // No subscribers is fine.
                let _ = self.events.send(event);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "dropping malformed push event"),
        }
    }
}

// ── Session task ─────────────────────────────────────────────────────

/// Connect, drive, back off, repeat until cancelled, rejected, or out of
/// attempts.
async fn run_session<C: PushConnector>(
    inner: Arc<TransportInner<C>>,
    epoch: u64,
    credential: Credential,
    cancel: CancellationToken,
    mut outbound: mpsc::UnboundedReceiver<PushFrame>,
) {
    let mut attempt: u32 = 0;

    loop {
        inner.publish(epoch, |info| {
            info.state = ConnectionState::Connecting;
            info.next_retry_in = None;
        });

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = tokio::time::timeout(inner.handshake_timeout, inner.connector.open(&credential)) => {
                result.unwrap_or_else(|_| Err(ApiError::HandshakeTimeout {
                    timeout_ms: millis(inner.handshake_timeout),
                }))
            }
        };

        let error = match opened {
            Ok(mut session) => {
                attempt = 0;
                info!("push channel connected");
                inner.publish(epoch, |info| {
                    *info = ConnectionInfo {
                        state: ConnectionState::Connected,
                        connected_at: Some(Utc::now()),
                        ..ConnectionInfo::default()
                    };
                });

                // Frames queued for an earlier session are not replayed.
                while outbound.try_recv().is_ok() {}

                let ended = drive(&inner, epoch, &mut session, &cancel, &mut outbound).await;
                session.close().await;
                match ended {
                    Some(e) => e,
                    None => break,
                }
            }
            Err(e) => e,
        };

        let message = error.to_string();

        if error.is_auth_rejected() {
            warn!(error = %error, "push credential rejected, not retrying");
            inner.publish(epoch, |info| {
                info.state = ConnectionState::Disconnected;
                info.connected_at = None;
                info.last_error = Some(message);
            });
            break;
        }

        attempt += 1;
        if attempt > inner.reconnect.max_attempts {
            warn!(
                error = %error,
                max_attempts = inner.reconnect.max_attempts,
                "push reconnection limit reached, giving up"
            );
            inner.publish(epoch, |info| {
                info.state = ConnectionState::Disconnected;
                info.connected_at = None;
                info.exhausted = true;
                info.last_error = Some(message);
            });
            break;
        }

        let delay = inner.reconnect.delay_for(attempt);
        info!(
            error = %error,
            attempt,
            delay_ms = millis(delay),
            "push channel down, waiting before reconnect"
        );
        inner.publish(epoch, |info| {
            info.state = ConnectionState::Disconnected;
            info.connected_at = None;
            info.reconnect_attempts = attempt;
            info.next_retry_in = Some(delay);
            info.last_error = Some(message);
        });

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    debug!(epoch, "push session task exiting");
}

/// Pump one connected session. Returns `None` when cancelled, otherwise
/// the reason the session ended.
async fn drive<C: PushConnector>(
    inner: &TransportInner<C>,
    epoch: u64,
    session: &mut C::Session,
    cancel: &CancellationToken,
    outbound: &mut mpsc::UnboundedReceiver<PushFrame>,
) -> Option<ApiError> {
    let heartbeat = inner.heartbeat;
    let mut ticker = heartbeat_ticker(heartbeat.interval);
    let mut last_pong = Instant::now();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            frame = session.recv() => match frame {
                Some(Ok(frame)) if frame.is_pong() => {
                    trace!("heartbeat acknowledged");
                    last_pong = Instant::now();
                    inner.publish(epoch, |info| info.last_heartbeat = Some(Utc::now()));
                }
                Some(Ok(frame)) => inner.dispatch(epoch, &frame),
                Some(Err(e)) => return Some(e),
                None => {
                    return Some(ApiError::WebSocketClosed {
                        code: 1000,
                        reason: "stream ended".into(),
                    });
                }
            },
            Some(frame) = outbound.recv() => {
                trace!(event = %frame.event, "sending push event");
                if let Err(e) = session.send(frame).await {
                    return Some(e);
                }
            }
            () = tick(&mut ticker) => {
                if let Some(limit) = heartbeat.timeout {
                    let silent = last_pong.elapsed();
                    if silent > limit {
                        return Some(ApiError::HeartbeatTimeout { silent_ms: millis(silent) });
                    }
                }
                if let Err(e) = session.send(PushFrame::ping()).await {
                    return Some(e);
                }
            }
        }
    }
}

fn heartbeat_ticker(period: Duration) -> Option<Interval> {
    if period.is_zero() {
        return None;
    }
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(ticker)
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ── Tests ────────────────────────────────────────────────────────────
