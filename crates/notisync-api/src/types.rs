// Wire types for the notification REST endpoints and push payloads.
//
// Field names follow the server's camelCase JSON. Everything the engine
// does not strictly need is optional so that older servers still decode.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Notifications ────────────────────────────────────────────────────

/// A notification as returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiNotification {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub read: Option<bool>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub action_required: Option<bool>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
}

/// Payload of `new-notification` / `high-priority-notification` push events.
///
/// Servers key pushed notifications by `notificationId`; some builds reuse
/// the REST shape instead, so `_id` and `id` are accepted as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushNotification {
    #[serde(alias = "_id", alias = "id")]
    pub notification_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub action_required: Option<bool>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
}

/// Payload of `notification-read|unread|deleted` push events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRef {
    #[serde(alias = "_id", alias = "id")]
    pub notification_id: String,
}

// ── Fetch API ────────────────────────────────────────────────────────

/// Pagination block of a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

/// One page of the notification list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    #[serde(default)]
    pub notifications: Vec<ApiNotification>,
    pub pagination: Pagination,
    #[serde(default)]
    pub has_more: Option<bool>,
}

impl PageResponse {
    /// Explicit server flag if present, otherwise `page * limit < total`.
    pub fn has_more(&self) -> bool {
        self.has_more.unwrap_or_else(|| {
            u64::from(self.pagination.page) * u64::from(self.pagination.limit)
                < self.pagination.total
        })
    }
}

/// Response of the quick-check probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickCheckResponse {
    #[serde(default)]
    pub has_changes: bool,
    pub total_count: u64,
    pub unread_count: u64,
}

/// Query parameters of the list endpoint.
///
/// `None` criteria mean "all" and are left out of the query string, as is
/// an empty search term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub page: u32,
    pub limit: u32,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
}

impl PageQuery {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit,
            ..Self::default()
        }
    }

    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(kind) = &self.kind {
            params.push(("type", kind.clone()));
        }
        if let Some(status) = &self.status {
            params.push(("status", status.clone()));
        }
        if let Some(priority) = &self.priority {
            params.push(("priority", priority.clone()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            params.push(("search", search.to_owned()));
        }
        params
    }
}

// ── Mutation API ─────────────────────────────────────────────────────

/// A state change requested from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    MarkRead(String),
    MarkUnread(String),
    Delete(String),
    MarkAllRead,
    ClearAll,
}

impl Mutation {
    /// The id this mutation targets, `None` for bulk operations.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::MarkRead(id) | Self::MarkUnread(id) | Self::Delete(id) => Some(id),
            Self::MarkAllRead | Self::ClearAll => None,
        }
    }
}

/// Server acknowledgement of a mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
}
