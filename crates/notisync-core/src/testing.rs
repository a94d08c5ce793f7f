// ── In-memory test doubles ──
//
// Scripted implementations of the fetch/mutation API and the push
// connector, used by the unit tests of every engine component.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use notisync_api::{
    Ack, ApiNotification, Credential, Error, Mutation, NotificationApi, PageQuery, PageResponse,
    Pagination, PushConnector, PushFrame, PushSession, QuickCheckResponse,
};

use crate::model::Notification;

// ── Builders ────────────────────────────────────────────────────────

pub(crate) fn api_notification(id: &str, read: bool) -> ApiNotification {
    serde_json::from_value(json!({
        "_id": id,
        "title": format!("Title {id}"),
        "description": format!("Body {id}"),
        "read": read,
        "type": "activity",
        "priority": "normal",
        "timestamp": "2026-01-05T10:00:00Z"
    }))
    .unwrap()
}

pub(crate) fn page(ids: &[(&str, bool)], page: u32, limit: u32, total: u64) -> PageResponse {
    PageResponse {
        notifications: ids.iter().map(|(id, read)| api_notification(id, *read)).collect(),
        pagination: Pagination { page, limit, total },
        has_more: None,
    }
}

pub(crate) fn notification(id: &str) -> Notification {
    Notification {
        id: id.into(),
        title: format!("Title {id}"),
        description: format!("Body {id}"),
        link: Some(format!("/activities/{id}")),
        category: None,
        priority: None,
        icon: None,
        read: false,
        created_at: Utc::now(),
        expires_at: None,
        action_required: None,
        metadata: BTreeMap::new(),
    }
}

pub(crate) fn refused() -> Error {
    Error::WebSocketConnect("connection refused".into())
}

// ── Scripted fetch/mutation API ─────────────────────────────────────

pub(crate) enum PageReply {
    Ready(PageResponse),
    Fail(u16),
    /// Resolves when the test sends the page.
    Deferred(oneshot::Receiver<PageResponse>),
}

/// Replies are consumed in order; once the script runs dry, `fetch_page`
/// answers with an empty page and `quick_check` with the last counters.
#[derive(Default)]
pub(crate) struct ScriptedApi {
    pages: Mutex<VecDeque<PageReply>>,
    page_calls: Mutex<Vec<PageQuery>>,
    probes: Mutex<VecDeque<Result<QuickCheckResponse, u16>>>,
    probe_calls: Mutex<Vec<(u64, u64)>>,
    mutations: Mutex<Vec<Mutation>>,
    mutation_failures: Mutex<VecDeque<u16>>,
}

impl ScriptedApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_page(&self, reply: PageReply) {
        self.pages.lock().unwrap().push_back(reply);
    }

    pub(crate) fn push_ready(&self, page: PageResponse) {
        self.push_page(PageReply::Ready(page));
    }

    /// Queue a page that resolves only when the returned sender fires.
    pub(crate) fn push_deferred(&self) -> oneshot::Sender<PageResponse> {
        let (tx, rx) = oneshot::channel();
        self.push_page(PageReply::Deferred(rx));
        tx
    }

    pub(crate) fn push_probe(&self, total: u64, unread: u64, has_changes: bool) {
        self.probes.lock().unwrap().push_back(Ok(QuickCheckResponse {
            has_changes,
            total_count: total,
            unread_count: unread,
        }));
    }

    pub(crate) fn push_probe_failure(&self, status: u16) {
        self.probes.lock().unwrap().push_back(Err(status));
    }

    pub(crate) fn fail_next_mutation(&self, status: u16) {
        self.mutation_failures.lock().unwrap().push_back(status);
    }

    pub(crate) fn page_calls(&self) -> Vec<PageQuery> {
        self.page_calls.lock().unwrap().clone()
    }

    pub(crate) fn probe_calls(&self) -> Vec<(u64, u64)> {
        self.probe_calls.lock().unwrap().clone()
    }

    pub(crate) fn mutations(&self) -> Vec<Mutation> {
        self.mutations.lock().unwrap().clone()
    }
}

fn http(status: u16) -> Error {
    Error::Http {
        status,
        message: "scripted failure".into(),
    }
}

impl NotificationApi for ScriptedApi {
    async fn fetch_page(&self, query: &PageQuery) -> Result<PageResponse, Error> {
        self.page_calls.lock().unwrap().push(query.clone());
        let reply = self.pages.lock().unwrap().pop_front();
        match reply {
            Some(PageReply::Ready(page)) => Ok(page),
            Some(PageReply::Fail(status)) => Err(http(status)),
            Some(PageReply::Deferred(rx)) => rx.await.map_err(|_| http(599)),
            None => Ok(page(&[], query.page, query.limit, 0)),
        }
    }

    async fn quick_check(
        &self,
        last_count: u64,
        last_unread: u64,
    ) -> Result<QuickCheckResponse, Error> {
        self.probe_calls
            .lock()
            .unwrap()
            .push((last_count, last_unread));
        let reply = self.probes.lock().unwrap().pop_front();
        match reply {
            Some(Ok(probe)) => Ok(probe),
            Some(Err(status)) => Err(http(status)),
            None => Ok(QuickCheckResponse {
                has_changes: false,
                total_count: last_count,
                unread_count: last_unread,
            }),
        }
    }

    async fn mutate(&self, mutation: &Mutation) -> Result<Ack, Error> {
        self.mutations.lock().unwrap().push(mutation.clone());
        let failure = self.mutation_failures.lock().unwrap().pop_front();
        match failure {
            Some(status) => Err(http(status)),
            None => Ok(Ack::default()),
        }
    }
}

// ── Scripted push connector ─────────────────────────────────────────

pub(crate) enum OpenOutcome {
    Accept(MockSession),
    Refuse,
    Reject,
    /// Never completes; exercises the handshake timeout.
    Hang,
}

/// Each `open` pops the next outcome; an empty script refuses.
#[derive(Default)]
pub(crate) struct ScriptedConnector {
    script: Mutex<VecDeque<OpenOutcome>>,
    opens: Mutex<Vec<Instant>>,
    tokens: Mutex<Vec<String>>,
    attempts: AtomicUsize,
}

impl ScriptedConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, outcome: OpenOutcome) {
        self.script.lock().unwrap().push_back(outcome);
    }

    /// Queue an accepted session and return its server side.
    pub(crate) fn accept(&self) -> SessionRemote {
        let (session, remote) = MockSession::pair();
        self.push(OpenOutcome::Accept(session));
        remote
    }

    pub(crate) fn open_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn open_times(&self) -> Vec<Instant> {
        self.opens.lock().unwrap().clone()
    }

    pub(crate) fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

impl PushConnector for ScriptedConnector {
    type Session = MockSession;

    async fn open(&self, credential: &Credential) -> Result<MockSession, Error> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.opens.lock().unwrap().push(Instant::now());
        self.tokens
            .lock()
            .unwrap()
            .push(credential.expose().to_owned());
        let outcome = self.script.lock().unwrap().pop_front();
        match outcome {
            Some(OpenOutcome::Accept(session)) => Ok(session),
            Some(OpenOutcome::Reject) => Err(Error::Unauthorized {
                message: "token revoked".into(),
            }),
            Some(OpenOutcome::Hang) => std::future::pending().await,
            Some(OpenOutcome::Refuse) | None => Err(refused()),
        }
    }
}

/// Client side of an in-memory push session.
pub(crate) struct MockSession {
    inbound: mpsc::UnboundedReceiver<Result<PushFrame, Error>>,
    outbound: mpsc::UnboundedSender<PushFrame>,
}

/// Server side: feed frames in, observe what the client sent, drop to
/// close the connection.
pub(crate) struct SessionRemote {
    pub(crate) inbound: mpsc::UnboundedSender<Result<PushFrame, Error>>,
    pub(crate) sent: mpsc::UnboundedReceiver<PushFrame>,
}

impl MockSession {
    pub(crate) fn pair() -> (Self, SessionRemote) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        (
            Self {
                inbound: inbound_rx,
                outbound: sent_tx,
            },
            SessionRemote {
                inbound: inbound_tx,
                sent: sent_rx,
            },
        )
    }
}

impl SessionRemote {
    pub(crate) fn push(&self, event: &str, data: serde_json::Value) {
        let _ = self.inbound.send(Ok(PushFrame::new(event, data)));
    }

    pub(crate) fn fail(&self) {
        let _ = self.inbound.send(Err(Error::WebSocketClosed {
            code: 1006,
            reason: "abnormal closure".into(),
        }));
    }
}

impl PushSession for MockSession {
    async fn recv(&mut self) -> Option<Result<PushFrame, Error>> {
        self.inbound.recv().await
    }

    async fn send(&mut self, frame: PushFrame) -> Result<(), Error> {
        self.outbound.send(frame).map_err(|_| Error::WebSocketClosed {
            code: 1006,
            reason: "peer gone".into(),
        })
    }

    async fn close(&mut self) {
        self.inbound.close();
    }
}
