// ── Pull fallback poller ──
//
// Two periodic tasks against the fetch API: a cheap quick-check probe that
// always runs, and a full refresh that only runs while push is down.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use notisync_api::NotificationApi;

use crate::store::Synchronizer;
use crate::transport::ConnectionInfo;

/// Handle to the running poll tasks. Dropping it stops them; call
/// [`stop`](Self::stop) to also wait for them to finish.
pub struct Poller {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Poller {
    /// Spawn the poll tasks. A zero interval leaves that task out.
    pub fn start<A: NotificationApi>(
        sync: Synchronizer<A>,
        connection: watch::Receiver<ConnectionInfo>,
        quick_check_interval: Duration,
        full_refresh_interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let mut handles = Vec::with_capacity(2);

        if let Some(ticker) = ticker(quick_check_interval) {
            let sync = sync.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(quick_check_loop(sync, ticker, cancel)));
        }
        if let Some(ticker) = ticker(full_refresh_interval) {
            let cancel = cancel.clone();
            handles.push(tokio::spawn(full_refresh_loop(
                sync, connection, ticker, cancel,
            )));
        }

        debug!(
            quick_check_ms = quick_check_interval.as_millis(),
            full_refresh_ms = full_refresh_interval.as_millis(),
            "poller started"
        );
        Self { cancel, handles }
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && self.handles.iter().any(|h| !h.is_finished())
    }

    /// Cancel both tasks and wait for them. No poll fires afterwards.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "poll task failed");
            }
        }
        debug!("poller stopped");
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// An interval whose first tick is one period away.
fn ticker(period: Duration) -> Option<Interval> {
    if period.is_zero() {
        return None;
    }
    let start = tokio::time::Instant::now() + period;
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(ticker)
}

async fn quick_check_loop<A: NotificationApi>(
    sync: Synchronizer<A>,
    mut ticker: Interval,
    cancel: CancellationToken,
) {
    // Counters from the previous successful probe. Until one succeeds the
    // probe compares against the local snapshot.
    let mut baseline: Option<(u64, u64)> = None;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let (last_count, last_unread) = baseline.unwrap_or_else(|| {
            let state = sync.snapshot();
            (state.total, u64::try_from(state.unread_count).unwrap_or(u64::MAX))
        });

        let probe = match sync.quick_check(last_count, last_unread).await {
            Ok(probe) => probe,
            Err(e) => {
                warn!(error = %e, "quick check failed");
                continue;
            }
        };

        let drifted = probe.has_changes
            || probe.total_count != last_count
            || probe.unread_count != last_unread;
        baseline = Some((probe.total_count, probe.unread_count));

        if drifted {
            debug!(
                total = probe.total_count,
                unread = probe.unread_count,
                "quick check detected changes, refreshing"
            );
            if let Err(e) = sync.refresh().await {
                warn!(error = %e, "refresh after quick check failed");
            }
        }
    }
}

async fn full_refresh_loop<A: NotificationApi>(
    sync: Synchronizer<A>,
    connection: watch::Receiver<ConnectionInfo>,
    mut ticker: Interval,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if connection.borrow().is_connected() {
            continue;
        }
        debug!("push unavailable, running full refresh");
        if let Err(e) = sync.refresh().await {
            warn!(error = %e, "fallback refresh failed");
        }
    }
}
