//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use notisync_core::{Notification, SyncState};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

/// Status line for stderr: green check, or plain text without color.
pub fn success(message: &str, color: bool) -> String {
    if color {
        format!("{} {message}", "✓".green())
    } else {
        message.to_owned()
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item views don't use
/// the `Tabled` derive.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub(crate) fn render_json<T: serde::Serialize + ?Sized>(
    data: &T,
    compact: bool,
) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.map_err(|e| CliError::Render(e.to_string()))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Render(e.to_string()))
}

// ── Notification views ───────────────────────────────────────────────

#[derive(Tabled)]
pub struct NotificationRow {
    #[tabled(rename = "")]
    pub marker: &'static str,
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Type")]
    pub category: String,
    #[tabled(rename = "Priority")]
    pub priority: String,
    #[tabled(rename = "Received")]
    pub received: String,
}

const TITLE_WIDTH: usize = 48;

impl NotificationRow {
    pub fn new(notification: &Notification, now: DateTime<Utc>) -> Self {
        Self {
            marker: if notification.read { "" } else { "●" },
            id: notification.id.to_string(),
            title: truncate(&notification.title, TITLE_WIDTH),
            category: notification
                .category
                .map_or_else(|| "-".into(), |c| c.to_string()),
            priority: notification
                .priority
                .map_or_else(|| "-".into(), |p| p.to_string()),
            received: relative_time(notification.created_at, now),
        }
    }
}

/// Multi-line detail view of one notification.
pub fn notification_detail(notification: &Notification) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let _ = writeln!(out, "{}", notification.title);
    if !notification.description.is_empty() {
        let _ = writeln!(out, "{}", notification.description);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "id:       {}", notification.id);
    let _ = writeln!(
        out,
        "status:   {}",
        if notification.read { "read" } else { "unread" }
    );
    if let Some(category) = notification.category {
        let _ = writeln!(out, "type:     {category}");
    }
    if let Some(priority) = notification.priority {
        let _ = writeln!(out, "priority: {priority}");
    }
    let _ = writeln!(out, "created:  {}", notification.created_at.to_rfc3339());
    if let Some(link) = &notification.link {
        let _ = writeln!(out, "link:     {link}");
    }
    out.trim_end().to_owned()
}

/// "Showing 10 of 42 (3 unread)".
pub fn inbox_summary(state: &SyncState) -> String {
    let mut summary = format!(
        "Showing {} of {} ({} unread)",
        state.notifications.len(),
        state.total,
        state.unread_count
    );
    if state.has_more {
        summary.push_str(", more available");
    }
    summary
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Coarse age: "just now", "5m ago", "3h ago", "2d ago", then a date.
pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(at);
    if age.num_seconds() < 60 {
        "just now".into()
    } else if age.num_minutes() < 60 {
        format!("{}m ago", age.num_minutes())
    } else if age.num_hours() < 24 {
        format!("{}h ago", age.num_hours())
    } else if age.num_days() < 7 {
        format!("{}d ago", age.num_days())
    } else {
        at.format("%Y-%m-%d").to_string()
    }
}
