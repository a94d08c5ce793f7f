// ── State synchronizer ──
//
// Single owner of the synchronization state. Page loads, push events,
// and mutation acknowledgements all land here; every edit republishes an
// immutable `SyncState` snapshot through a `watch` channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use notisync_api::{Mutation, NotificationApi, PageResponse, QuickCheckResponse};

use super::list::NotificationList;
use crate::error::CoreError;
use crate::event::{Change, ServerEvent};
use crate::model::{FilterPatch, Notification, NotificationFilter, NotificationId};
use crate::stream::StateStream;

const ALERT_CHANNEL_SIZE: usize = 64;

// ── Published snapshot ───────────────────────────────────────────────

/// What the UI renders. `unread_count` is always derived from the list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncState {
    pub notifications: Vec<Arc<Notification>>,
    pub unread_count: usize,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub has_more: bool,
    pub filter: NotificationFilter,
    pub loading: bool,
    pub error: Option<String>,
    pub last_refresh: Option<DateTime<Utc>>,
}

/// Result of a page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The page was merged into the state.
    Applied,
    /// A newer request was issued while this one was in flight; the
    /// response was dropped.
    Stale,
    /// Nothing to load (no more pages, or a load is already running).
    Skipped,
}

// ── Internal state ───────────────────────────────────────────────────

struct Store {
    list: NotificationList,
    filter: NotificationFilter,
    page: u32,
    page_size: u32,
    total: u64,
    has_more: bool,
    loading: bool,
    error: Option<String>,
    last_refresh: Option<DateTime<Utc>>,
    /// Bumped by every load request and by `reset`.
    generation: u64,
    /// Locally deleted ids, keyed to the generation current at deletion.
    /// A reset page only retires entries older than its own request.
    deleted: HashMap<NotificationId, u64>,
}

impl Store {
    fn new(page_size: u32, generation: u64) -> Self {
        Self {
            list: NotificationList::default(),
            filter: NotificationFilter::default(),
            page: 1,
            page_size,
            total: 0,
            has_more: false,
            loading: false,
            error: None,
            last_refresh: None,
            generation,
            deleted: HashMap::new(),
        }
    }

    fn snapshot(&self) -> SyncState {
        SyncState {
            notifications: self.list.snapshot(),
            unread_count: self.list.unread_count(),
            page: self.page,
            page_size: self.page_size,
            total: self.total,
            has_more: self.has_more,
            filter: self.filter.clone(),
            loading: self.loading,
            error: self.error.clone(),
            last_refresh: self.last_refresh,
        }
    }

    fn apply_page(&mut self, page: u32, response: PageResponse, reset: bool) {
        let has_more = response.has_more();
        let total = response.pagination.total;
        let incoming = response.notifications.into_iter().map(Notification::from);

        if reset {
            let generation = self.generation;
            self.deleted.retain(|_, deleted_at| *deleted_at >= generation);
        }
        let deleted = &self.deleted;
        let incoming = incoming.filter(|n| !deleted.contains_key(&n.id));
        if reset {
            self.list.replace_all(incoming);
        } else {
            self.list.append(incoming);
        }

        self.page = page;
        self.total = total;
        self.has_more = has_more;
        self.error = None;
        self.last_refresh = Some(Utc::now());
    }

    /// The merge function. Returns whether the visible state changed and,
    /// for upserts, the entry if it was newly inserted.
    fn merge(&mut self, change: Change) -> (bool, Option<Arc<Notification>>) {
        match change {
            Change::Upsert(mut incoming) => {
                if let Some(existing) = self.list.get(&incoming.id) {
                    // A read flag set locally survives a re-delivered push.
                    incoming.read |= existing.read;
                    return (self.list.replace(incoming), None);
                }
                if self.deleted.contains_key(&incoming.id) {
                    debug!(id = %incoming.id, "ignoring upsert of locally deleted notification");
                    return (false, None);
                }
                if !self.filter.matches(&incoming) {
                    debug!(id = %incoming.id, "pushed notification outside active filter");
                    return (false, None);
                }
                let entry = Arc::new(incoming);
                self.list.prepend(Arc::clone(&entry));
                self.total += 1;
                (true, Some(entry))
            }
            Change::Read(id) => (self.list.set_read(&id, true), None),
            Change::Unread(id) => (self.list.set_read(&id, false), None),
            Change::Removed(id) => {
                let removed = self.list.remove(&id).is_some();
                if removed {
                    self.total = self.total.saturating_sub(1);
                }
                self.deleted.insert(id, self.generation);
                (removed, None)
            }
            Change::AllRead => (self.list.mark_all_read(), None),
            Change::Cleared => {
                let changed = !self.list.is_empty() || self.total != 0 || self.has_more;
                self.list.clear();
                self.deleted.clear();
                self.total = 0;
                self.has_more = false;
                self.page = 1;
                (changed, None)
            }
        }
    }
}

// ── Synchronizer ─────────────────────────────────────────────────────

/// The canonical notification store.
///
/// Cheaply cloneable via `Arc<SyncInner>`. Generic over the fetch/mutation
/// API so tests can drive it with scripted responses.
pub struct Synchronizer<A> {
    inner: Arc<SyncInner<A>>,
}

impl<A> Clone for Synchronizer<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SyncInner<A> {
    api: A,
    store: Mutex<Store>,
    state: watch::Sender<Arc<SyncState>>,
    alerts: broadcast::Sender<Arc<Notification>>,
}

impl<A: NotificationApi> Synchronizer<A> {
    pub fn new(api: A, page_size: u32) -> Self {
        let store = Store::new(page_size.max(1), 0);
        let (state, _) = watch::channel(Arc::new(store.snapshot()));
        let (alerts, _) = broadcast::channel(ALERT_CHANNEL_SIZE);

        Self {
            inner: Arc::new(SyncInner {
                api,
                store: Mutex::new(store),
                state,
                alerts,
            }),
        }
    }

    /// The underlying fetch/mutation API.
    pub fn api(&self) -> &A {
        &self.inner.api
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<SyncState> {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> StateStream {
        StateStream::new(self.inner.state.subscribe())
    }

    /// High-priority notifications, each delivered once when first inserted.
    pub fn alerts(&self) -> broadcast::Receiver<Arc<Notification>> {
        self.inner.alerts.subscribe()
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Fetch a page with the current filter.
    ///
    /// `reset` loads page 1 and replaces the list; otherwise the page after
    /// the last loaded one is appended. A failure keeps the previous state
    /// and sets the error flag. A response that arrives after a newer
    /// request was issued is dropped.
    pub async fn load_page(&self, reset: bool) -> Result<LoadOutcome, CoreError> {
        let (generation, query) = {
            let mut store = self.lock();
            if !reset && (store.loading || !store.has_more) {
                return Ok(LoadOutcome::Skipped);
            }
            store.generation += 1;
            store.loading = true;
            let page = if reset { 1 } else { store.page + 1 };
            let query = store.filter.to_query(page, store.page_size);
            self.commit(&store);
            (store.generation, query)
        };

        debug!(generation, page = query.page, reset, "loading notifications");
        let result = self.inner.api.fetch_page(&query).await;

        let mut store = self.lock();
        if store.generation != generation {
            debug!(
                generation,
                current = store.generation,
                "discarding stale page response"
            );
            return Ok(LoadOutcome::Stale);
        }
        store.loading = false;

        match result {
            Ok(response) => {
                store.apply_page(query.page, response, reset);
                debug!(
                    generation,
                    loaded = store.list.len(),
                    total = store.total,
                    "page applied"
                );
                self.commit(&store);
                Ok(LoadOutcome::Applied)
            }
            Err(e) => {
                warn!(error = %e, generation, "page load failed");
                store.error = Some(e.to_string());
                self.commit(&store);
                Err(e.into())
            }
        }
    }

    /// Reload page 1 with the current filter.
    pub async fn refresh(&self) -> Result<LoadOutcome, CoreError> {
        self.load_page(true).await
    }

    /// Append the next page. Returns `false` when there was nothing to do.
    pub async fn load_more(&self) -> Result<bool, CoreError> {
        Ok(self.load_page(false).await? == LoadOutcome::Applied)
    }

    /// Merge into the filter criteria and reload from page 1.
    pub async fn apply_filters(&self, patch: FilterPatch) -> Result<LoadOutcome, CoreError> {
        {
            let mut store = self.lock();
            store.filter.apply(patch);
            store.page = 1;
            debug!(filter = ?store.filter, "filters changed");
        }
        self.load_page(true).await
    }

    pub async fn search(&self, term: impl Into<String>) -> Result<LoadOutcome, CoreError> {
        self.apply_filters(FilterPatch::search(term)).await
    }

    pub async fn reset_filters(&self) -> Result<LoadOutcome, CoreError> {
        self.apply_filters(FilterPatch::clear_all()).await
    }

    /// Forward a quick-check probe to the fetch API.
    pub async fn quick_check(
        &self,
        last_count: u64,
        last_unread: u64,
    ) -> Result<QuickCheckResponse, CoreError> {
        Ok(self.inner.api.quick_check(last_count, last_unread).await?)
    }

    // ── Merging ──────────────────────────────────────────────────────

    /// Merge a push event. Never fails: events that do not apply are no-ops.
    pub fn ingest_event(&self, event: &ServerEvent) {
        let Some(change) = event.change() else {
            debug!(?event, "event carries no state change");
            return;
        };
        let inserted = self.apply_change(change);

        if let (ServerEvent::HighPriorityNotification(_), Some(entry)) = (event, inserted) {
            info!(id = %entry.id, title = %entry.title, "high-priority notification");
            let _ = self.inner.alerts.send(entry);
        }
    }

    /// Apply a change through the merge function. Returns `true` if the
    /// published state changed.
    pub fn apply(&self, change: Change) -> bool {
        let mut store = self.lock();
        let (changed, _) = store.merge(change);
        if changed {
            self.commit(&store);
        }
        changed
    }

    fn apply_change(&self, change: Change) -> Option<Arc<Notification>> {
        let mut store = self.lock();
        let (changed, inserted) = store.merge(change);
        if changed {
            self.commit(&store);
        }
        inserted
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub async fn mark_read(&self, id: &NotificationId) -> Result<(), CoreError> {
        self.mutate(Mutation::MarkRead(id.to_string()), Change::Read(id.clone()))
            .await
    }

    pub async fn mark_unread(&self, id: &NotificationId) -> Result<(), CoreError> {
        self.mutate(Mutation::MarkUnread(id.to_string()), Change::Unread(id.clone()))
            .await
    }

    pub async fn delete(&self, id: &NotificationId) -> Result<(), CoreError> {
        self.mutate(Mutation::Delete(id.to_string()), Change::Removed(id.clone()))
            .await
    }

    pub async fn mark_all_read(&self) -> Result<(), CoreError> {
        self.mutate(Mutation::MarkAllRead, Change::AllRead).await
    }

    pub async fn clear_all(&self) -> Result<(), CoreError> {
        self.mutate(Mutation::ClearAll, Change::Cleared).await
    }

    /// Navigate to a loaded notification: marks it read first if needed and
    /// returns its link.
    pub async fn open(&self, id: &NotificationId) -> Result<Option<String>, CoreError> {
        let entry = self
            .lock()
            .list
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound { id: id.to_string() })?;

        if !entry.read {
            self.mark_read(id).await?;
        }
        Ok(entry.link.clone())
    }

    /// Issue a mutation and, once acknowledged, apply the matching change.
    async fn mutate(&self, mutation: Mutation, change: Change) -> Result<(), CoreError> {
        match self.inner.api.mutate(&mutation).await {
            Ok(ack) => {
                debug!(?mutation, message = ?ack.message, "mutation acknowledged");
                self.apply(change);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, ?mutation, "mutation failed");
                let mut store = self.lock();
                store.error = Some(e.to_string());
                self.commit(&store);
                Err(e.into())
            }
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Back to the initial state. In-flight loads are invalidated.
    pub fn reset(&self) {
        let mut store = self.lock();
        let next = Store::new(store.page_size, store.generation + 1);
        *store = next;
        self.commit(&store);
        debug!("synchronizer reset");
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.inner.store.lock().expect("sync store lock poisoned")
    }

    /// Publish while the lock is held so snapshots go out in edit order.
    fn commit(&self, store: &Store) {
        self.inner.state.send_replace(Arc::new(store.snapshot()));
    }
}
