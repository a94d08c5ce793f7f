// ── Engine ──
//
// Wires the transport manager, the fallback poller, and the synchronizer
// together and drives them from the credential signal. Two background
// tasks: one follows login/logout, the other bridges push events and
// connection changes into the store.

use std::sync::{Arc, Mutex as StdMutex};

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use notisync_api::{
    Credential, NotificationApi, NotificationClient, PushConnector, TransportConfig, WsConnector,
};

use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::event::ServerEvent;
use crate::model::Notification;
use crate::poller::Poller;
use crate::store::Synchronizer;
use crate::stream::StateStream;
use crate::transport::{ConnectionInfo, TransportManager};

/// Engine over the HTTP client and the WebSocket push channel.
pub type LiveEngine = Engine<NotificationClient, WsConnector>;

/// Point-in-time view of the engine's moving parts.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub push_connected: bool,
    pub polling_active: bool,
    pub connection: ConnectionInfo,
    pub loaded: usize,
    pub unread: usize,
    pub total: u64,
}

/// The sync engine.
///
/// Cheaply cloneable via `Arc<EngineInner>`. Does nothing until
/// [`start()`](Self::start) hands it a credential signal.
pub struct Engine<A: NotificationApi, C: PushConnector> {
    inner: Arc<EngineInner<A, C>>,
}

impl<A: NotificationApi, C: PushConnector> Clone for Engine<A, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct EngineInner<A: NotificationApi, C: PushConnector> {
    config: EngineConfig,
    sync: Synchronizer<A>,
    transport: TransportManager<C>,
    poller: StdMutex<Option<Poller>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl LiveEngine {
    /// Build the HTTP client and WebSocket connector from `config`. The
    /// client reads its bearer token from `credentials`.
    pub fn live(
        config: EngineConfig,
        credentials: watch::Receiver<Option<Credential>>,
    ) -> Result<Self, CoreError> {
        let transport = TransportConfig::with_timeout(config.request_timeout);
        let client = NotificationClient::new(config.api_url.as_str(), &transport, credentials)?;
        let connector = WsConnector::new(config.resolved_push_url()?);
        Ok(Self::new(client, connector, config))
    }
}

impl<A: NotificationApi, C: PushConnector> Engine<A, C> {
    pub fn new(api: A, connector: C, config: EngineConfig) -> Self {
        let sync = Synchronizer::new(api, config.page_size);
        let transport = TransportManager::new(connector, &config);

        Self {
            inner: Arc::new(EngineInner {
                config,
                sync,
                transport,
                poller: StdMutex::new(None),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn synchronizer(&self) -> &Synchronizer<A> {
        &self.inner.sync
    }

    pub fn transport(&self) -> &TransportManager<C> {
        &self.inner.transport
    }

    /// Snapshot stream of the inbox.
    pub fn subscribe(&self) -> StateStream {
        self.inner.sync.subscribe()
    }

    pub fn alerts(&self) -> broadcast::Receiver<Arc<Notification>> {
        self.inner.sync.alerts()
    }

    pub fn connection(&self) -> watch::Receiver<ConnectionInfo> {
        self.inner.transport.state()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the credential and bridge tasks. Calling it twice is a no-op.
    pub async fn start(&self, credentials: watch::Receiver<Option<Credential>>) {
        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            debug!("engine already started");
            return;
        }

        // Subscribe before any session can exist so no event is missed.
        let events = self.inner.transport.events();
        let connection = self.inner.transport.state();

        let cancel = self.inner.cancel.clone();
        handles.push(tokio::spawn(bridge_task(
            self.clone(),
            events,
            connection,
            cancel.clone(),
        )));
        handles.push(tokio::spawn(credential_task(
            self.clone(),
            credentials,
            cancel,
        )));
        info!("engine started");
    }

    /// Stop every task and timer. The engine cannot be restarted.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "engine task failed");
            }
        }
        drop(handles);

        self.stop_polling().await;
        self.inner.transport.shutdown().await;
        debug!("engine shut down");
    }

    pub fn stats(&self) -> EngineStats {
        let state = self.inner.sync.snapshot();
        let connection = self.inner.transport.info();
        EngineStats {
            push_connected: connection.is_connected(),
            polling_active: self.lock_poller().as_ref().is_some_and(Poller::is_active),
            connection,
            loaded: state.notifications.len(),
            unread: state.unread_count,
            total: state.total,
        }
    }

    // ── Session transitions ──────────────────────────────────────────

    async fn login(&self, credential: Credential) {
        info!("credential available, starting sync");
        self.inner.transport.connect(credential);
        self.start_polling();
        self.refresh("login").await;
    }

    async fn switch_credential(&self, credential: Credential) {
        info!("credential changed, reconnecting");
        self.inner.transport.connect(credential);
        self.refresh("credential change").await;
    }

    async fn logout(&self) {
        info!("credential revoked, stopping sync");
        self.stop_polling().await;
        self.inner.transport.disconnect();
        self.inner.sync.reset();
    }

    async fn refresh(&self, reason: &str) {
        if let Err(e) = self.inner.sync.refresh().await {
            warn!(error = %e, reason, "refresh failed");
        }
    }

    fn start_polling(&self) {
        let mut slot = self.lock_poller();
        if slot.is_some() {
            return;
        }
        *slot = Some(Poller::start(
            self.inner.sync.clone(),
            self.inner.transport.state(),
            self.inner.config.quick_check_interval,
            self.inner.config.full_refresh_interval,
        ));
    }

    async fn stop_polling(&self) {
        let poller = self.lock_poller().take();
        if let Some(mut poller) = poller {
            poller.stop().await;
        }
    }

    fn lock_poller(&self) -> std::sync::MutexGuard<'_, Option<Poller>> {
        self.inner.poller.lock().expect("poller lock poisoned")
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Follow the credential signal: login, credential change, logout.
async fn credential_task<A: NotificationApi, C: PushConnector>(
    engine: Engine<A, C>,
    mut credentials: watch::Receiver<Option<Credential>>,
    cancel: CancellationToken,
) {
    let mut current: Option<Credential> = None;

    loop {
        let next = credentials.borrow_and_update().clone();
        match (current.take(), next) {
            (None, Some(credential)) => {
                engine.login(credential.clone()).await;
                current = Some(credential);
            }
            (Some(previous), Some(credential)) => {
                if previous != credential {
                    engine.switch_credential(credential.clone()).await;
                }
                current = Some(credential);
            }
            (Some(_), None) => engine.logout().await,
            (None, None) => {}
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = credentials.changed() => {
                if changed.is_err() {
                    debug!("credential source dropped");
                    break;
                }
            }
        }
    }
}

/// Forward push events into the store and refresh on reconnect.
async fn bridge_task<A: NotificationApi, C: PushConnector>(
    engine: Engine<A, C>,
    mut events: broadcast::Receiver<ServerEvent>,
    mut connection: watch::Receiver<ConnectionInfo>,
    cancel: CancellationToken,
) {
    let mut connected = connection.borrow_and_update().is_connected();
    let mut had_session = connected;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = events.recv() => match event {
                Ok(ServerEvent::RefreshRequired { reason }) => {
                    debug!(reason = %reason, "server requested refresh");
                    engine.refresh(&reason).await;
                }
                Ok(event) => engine.inner.sync.ingest_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "push events dropped, refreshing");
                    engine.refresh("event lag").await;
                }
                Err(RecvError::Closed) => break,
            },
            changed = connection.changed() => {
                if changed.is_err() {
                    break;
                }
                let now = connection.borrow_and_update().is_connected();
                if now && !connected {
                    if had_session {
                        info!("push channel back, catching up");
                        engine.refresh("reconnect").await;
                    }
                    had_session = true;
                }
                connected = now;
            }
        }
    }
}
