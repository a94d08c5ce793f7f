// ── Filter criteria ──
//
// A pure predicate over `Notification`. The same criteria are sent to the
// server as list query parameters and applied locally to pushed entries.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use notisync_api::PageQuery;

use super::notification::{Category, Notification, Priority};

/// Read-status criterion.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ReadStatus {
    Read,
    Unread,
}

/// Active filter criteria. `None` / empty means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFilter {
    pub category: Option<Category>,
    pub status: Option<ReadStatus>,
    pub priority: Option<Priority>,
    pub search: String,
}

impl NotificationFilter {
    pub fn matches(&self, notification: &Notification) -> bool {
        if self
            .category
            .is_some_and(|c| notification.category != Some(c))
        {
            return false;
        }
        if self
            .priority
            .is_some_and(|p| notification.priority != Some(p))
        {
            return false;
        }
        match self.status {
            Some(ReadStatus::Read) if !notification.read => return false,
            Some(ReadStatus::Unread) if notification.read => return false,
            _ => {}
        }

        let term = self.search.trim();
        if term.is_empty() {
            return true;
        }
        let term = term.to_lowercase();
        notification.title.to_lowercase().contains(&term)
            || notification.description.to_lowercase().contains(&term)
    }

    /// True when no criterion constrains the list.
    pub fn is_unfiltered(&self) -> bool {
        self.category.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.search.trim().is_empty()
    }

    /// Merge a partial update into these criteria.
    pub fn apply(&mut self, patch: FilterPatch) {
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(search) = patch.search {
            self.search = search;
        }
    }

    /// List query for `page` with these criteria.
    pub fn to_query(&self, page: u32, limit: u32) -> PageQuery {
        let mut query = PageQuery::new(page, limit);
        query.kind = self.category.map(|c| c.to_string());
        query.status = self.status.map(|s| s.to_string());
        query.priority = self.priority.map(|p| p.to_string());
        let term = self.search.trim();
        if !term.is_empty() {
            query.search = Some(term.to_owned());
        }
        query
    }
}

/// Partial filter update. Outer `None` leaves a criterion untouched;
/// `Some(None)` resets it to "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub category: Option<Option<Category>>,
    pub status: Option<Option<ReadStatus>>,
    pub priority: Option<Option<Priority>>,
    pub search: Option<String>,
}

impl FilterPatch {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }

    /// Reset every criterion to "all".
    pub fn clear_all() -> Self {
        Self {
            category: Some(None),
            status: Some(None),
            priority: Some(None),
            search: Some(String::new()),
        }
    }
}
