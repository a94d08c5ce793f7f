//! One-shot inbox commands: list, open, and the mutations.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use notisync_core::{FilterPatch, Notification, NotificationId};

use super::logged_in_engine;
use crate::cli::{ListArgs, OutputFormat};
use crate::config::{Presentation, Session};
use crate::error::CliError;
use crate::output::{self, NotificationRow};

// ── List ─────────────────────────────────────────────────────────────

pub async fn list(
    args: ListArgs,
    mut session: Session,
    present: Presentation,
) -> Result<(), CliError> {
    if let Some(limit) = args.limit {
        session.engine.page_size = limit;
    }
    let (engine, _credentials) = logged_in_engine(&session)?;
    let sync = engine.synchronizer();

    let patch = FilterPatch {
        category: args.kind.map(|k| Some(k.into())),
        status: args.status.map(|s| Some(s.into())),
        priority: args.priority.map(|p| Some(p.into())),
        search: args.search,
    };
    sync.apply_filters(patch).await?;

    // Pages are appended in order; stop early when the server runs out.
    // Each page's slice starts where the list ended before it was loaded,
    // since ids already present are not appended again.
    let target = if args.all_pages { u32::MAX } else { args.page };
    let mut page_start = 0;
    while sync.snapshot().page < target {
        let before = sync.snapshot().notifications.len();
        if !sync.load_more().await? {
            break;
        }
        page_start = before;
    }

    let state = sync.snapshot();
    debug!(
        loaded = state.notifications.len(),
        page = state.page,
        page_start,
        "list loaded"
    );
    let shown: &[Arc<Notification>] = if args.all_pages {
        &state.notifications
    } else if state.page < args.page {
        &[]
    } else {
        state.notifications.get(page_start..).unwrap_or_default()
    };

    if present.format == OutputFormat::Table && shown.is_empty() {
        if !present.quiet {
            eprintln!("No notifications");
        }
        return Ok(());
    }

    let now = Utc::now();
    let rendered = output::render_list(
        present.format,
        shown,
        |n| NotificationRow::new(n, now),
        |n| n.id.to_string(),
    )?;
    output::print_output(&rendered, present.quiet);

    if present.format == OutputFormat::Table && !present.quiet {
        eprintln!("{}", output::inbox_summary(&state));
    }
    Ok(())
}

// ── Open ─────────────────────────────────────────────────────────────

/// Find a notification in the inbox, mark it read if needed, and show it.
/// Plain output prints only the link so it can be piped to a browser.
pub async fn open(id: &str, session: &Session, present: Presentation) -> Result<(), CliError> {
    let (engine, _credentials) = logged_in_engine(session)?;
    let sync = engine.synchronizer();
    let target = NotificationId::from(id);

    sync.refresh().await?;
    while !sync.snapshot().notifications.iter().any(|n| n.id == target) {
        if !sync.load_more().await? {
            break;
        }
    }
    let was_unread = find(&sync.snapshot().notifications, &target).is_some_and(|n| !n.read);

    let link = sync
        .open(&target)
        .await
        .map_err(|e| CliError::for_id(e, id))?;
    let entry = find(&sync.snapshot().notifications, &target).ok_or_else(|| {
        CliError::NotFound {
            identifier: id.to_owned(),
        }
    })?;

    let rendered = output::render_single(
        present.format,
        entry.as_ref(),
        output::notification_detail,
        |n| link.clone().unwrap_or_else(|| n.id.to_string()),
    )?;
    output::print_output(&rendered, present.quiet);
    if was_unread {
        report(&format!("Marked {id} as read"), present);
    }
    Ok(())
}

fn find(list: &[Arc<Notification>], id: &NotificationId) -> Option<Arc<Notification>> {
    list.iter().find(|n| &n.id == id).cloned()
}

// ── Mutations ────────────────────────────────────────────────────────

pub async fn mark_read(id: &str, session: &Session, present: Presentation) -> Result<(), CliError> {
    let (engine, _credentials) = logged_in_engine(session)?;
    engine
        .synchronizer()
        .mark_read(&NotificationId::from(id))
        .await
        .map_err(|e| CliError::for_id(e, id))?;
    report(&format!("Marked {id} as read"), present);
    Ok(())
}

pub async fn mark_unread(
    id: &str,
    session: &Session,
    present: Presentation,
) -> Result<(), CliError> {
    let (engine, _credentials) = logged_in_engine(session)?;
    engine
        .synchronizer()
        .mark_unread(&NotificationId::from(id))
        .await
        .map_err(|e| CliError::for_id(e, id))?;
    report(&format!("Marked {id} as unread"), present);
    Ok(())
}

pub async fn delete(id: &str, session: &Session, present: Presentation) -> Result<(), CliError> {
    let (engine, _credentials) = logged_in_engine(session)?;
    engine
        .synchronizer()
        .delete(&NotificationId::from(id))
        .await
        .map_err(|e| CliError::for_id(e, id))?;
    report(&format!("Deleted {id}"), present);
    Ok(())
}

pub async fn read_all(session: &Session, present: Presentation) -> Result<(), CliError> {
    let (engine, _credentials) = logged_in_engine(session)?;
    engine.synchronizer().mark_all_read().await?;
    report("Marked all notifications as read", present);
    Ok(())
}

pub async fn clear(session: &Session, present: Presentation) -> Result<(), CliError> {
    let (engine, _credentials) = logged_in_engine(session)?;
    engine.synchronizer().clear_all().await?;
    report("Cleared all notifications", present);
    Ok(())
}

/// Confirmation on stderr so stdout stays scriptable.
fn report(message: &str, present: Presentation) {
    if !present.quiet {
        eprintln!("{}", output::success(message, present.color));
    }
}
