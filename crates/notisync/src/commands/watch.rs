//! `watch`: run the sync engine until Ctrl-C.
//!
//! Prints connection transitions, an inbox summary whenever the counters
//! move, and every high-priority alert. Structured formats emit one
//! compact JSON object per line instead.

use std::fmt::Write as _;

use chrono::Utc;
use owo_colors::OwoColorize;
use secrecy::ExposeSecret;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use notisync_core::{
    ConnectionInfo, ConnectionState, CredentialSource, LiveEngine, Notification, SyncState,
};

use crate::cli::{OutputFormat, WatchArgs};
use crate::config::{Presentation, Session};
use crate::error::CliError;
use crate::output::{self, NotificationRow};

/// One line of `watch` output in structured mode.
#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum WatchLine<'a> {
    Connection(&'a ConnectionInfo),
    Inbox {
        loaded: usize,
        unread: usize,
        total: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        notifications: Option<&'a [std::sync::Arc<Notification>]>,
    },
    Alert(&'a Notification),
}

/// Counters that decide whether a snapshot is worth printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Summary {
    loaded: usize,
    unread: usize,
    total: u64,
}

impl Summary {
    fn of(state: &SyncState) -> Self {
        Self {
            loaded: state.notifications.len(),
            unread: state.unread_count,
            total: state.total,
        }
    }
}

pub async fn handle(
    args: WatchArgs,
    session: Session,
    present: Presentation,
) -> Result<(), CliError> {
    let credentials = CredentialSource::new();
    let engine = LiveEngine::live(session.engine.clone(), credentials.subscribe())?;

    let mut connection = engine.connection();
    let mut states = engine.subscribe();
    let mut alerts = engine.alerts();

    engine.start(credentials.subscribe()).await;
    credentials.login(session.token.expose_secret());
    if !present.quiet {
        eprintln!(
            "Watching {} (profile '{}'), Ctrl-C to stop",
            session.engine.api_url, session.profile_name
        );
    }

    let printer = Printer {
        present,
        full: args.full,
    };
    let mut last_state: Option<ConnectionState> = None;
    let mut last_summary: Option<Summary> = None;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            biased;
            signal = &mut ctrl_c => {
                debug!("interrupted");
                break signal.map_err(CliError::from);
            }
            changed = connection.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let info = connection.borrow_and_update().clone();
                // Retry countdowns republish the same state; print transitions
                // and exhaustion only.
                if last_state != Some(info.state) || info.exhausted {
                    last_state = Some(info.state);
                    printer.connection(&info)?;
                }
            }
            snapshot = states.changed() => {
                let Some(state) = snapshot else { break Ok(()) };
                if state.loading {
                    continue;
                }
                let summary = Summary::of(&state);
                if last_summary != Some(summary) {
                    last_summary = Some(summary);
                    printer.inbox(&state)?;
                }
            }
            alert = alerts.recv() => match alert {
                Ok(notification) => printer.alert(&notification)?,
                Err(RecvError::Lagged(missed)) => warn!(missed, "alert receiver lagged"),
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    engine.shutdown().await;
    if !present.quiet {
        eprintln!("Stopped");
    }
    result
}

// ── Rendering ────────────────────────────────────────────────────────

struct Printer {
    present: Presentation,
    full: bool,
}

impl Printer {
    fn structured(&self) -> bool {
        !matches!(
            self.present.format,
            OutputFormat::Table | OutputFormat::Plain
        )
    }

    fn emit(&self, line: &WatchLine<'_>) -> Result<(), CliError> {
        let rendered = output::render_json(line, true)?;
        output::print_output(&rendered, false);
        Ok(())
    }

    fn connection(&self, info: &ConnectionInfo) -> Result<(), CliError> {
        if self.structured() {
            return self.emit(&WatchLine::Connection(info));
        }
        if self.present.quiet {
            return Ok(());
        }

        let mut line = format!("push {}", info.state);
        if info.exhausted {
            line.push_str(" (gave up reconnecting, polling only)");
        } else if let Some(delay) = info.next_retry_in {
            let _ = write!(
                line,
                " (retry {} in {})",
                info.reconnect_attempts,
                humantime::format_duration(delay)
            );
        }
        if let Some(err) = info
            .last_error
            .as_ref()
            .filter(|_| info.state != ConnectionState::Connected)
        {
            let _ = write!(line, ": {err}");
        }

        let line = match (self.present.color, info.state) {
            (false, _) => line,
            (true, ConnectionState::Connected) => line.green().to_string(),
            (true, ConnectionState::Connecting) => line.yellow().to_string(),
            (true, ConnectionState::Disconnected) => line.red().to_string(),
        };
        output::print_output(&line, false);
        Ok(())
    }

    fn inbox(&self, state: &SyncState) -> Result<(), CliError> {
        if self.structured() {
            return self.emit(&WatchLine::Inbox {
                loaded: state.notifications.len(),
                unread: state.unread_count,
                total: state.total,
                notifications: self.full.then_some(state.notifications.as_slice()),
            });
        }
        if self.present.quiet {
            return Ok(());
        }

        if self.full && !state.notifications.is_empty() {
            let now = Utc::now();
            let table = output::render_list(
                OutputFormat::Table,
                state.notifications.as_slice(),
                |n| NotificationRow::new(n, now),
                |n| n.id.to_string(),
            )?;
            output::print_output(&table, false);
        }
        let summary = output::inbox_summary(state);
        let summary = match &state.error {
            Some(err) => format!("{summary} [last load failed: {err}]"),
            None => summary,
        };
        output::print_output(&summary, false);
        Ok(())
    }

    fn alert(&self, notification: &Notification) -> Result<(), CliError> {
        if self.structured() {
            return self.emit(&WatchLine::Alert(notification));
        }
        // Alerts are printed even in quiet mode.
        let line = format!("ALERT {}: {}", notification.id, notification.title);
        let line = if self.present.color {
            line.red().bold().to_string()
        } else {
            line
        };
        output::print_output(&line, false);
        Ok(())
    }
}
