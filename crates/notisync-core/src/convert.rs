// ── API-to-domain type conversions ──
//
// Bridges raw `notisync_api` wire types into canonical `notisync_core::model`
// types. Unknown enum strings become `None`, missing flags take their
// documented defaults, and unparseable timestamps fall back to receipt time.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use notisync_api::{ApiNotification, PushNotification};

use crate::model::{Category, Notification, Priority};

// ── Helpers ────────────────────────────────────────────────────────

/// Parse an RFC 3339 timestamp, silently dropping unparseable values.
fn parse_datetime(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_enum<T: FromStr>(raw: Option<&str>) -> Option<T> {
    raw.and_then(|s| T::from_str(s.trim()).ok())
}

// ── Notification ───────────────────────────────────────────────────

impl From<ApiNotification> for Notification {
    fn from(n: ApiNotification) -> Self {
        let created_at = parse_datetime(n.timestamp.as_deref())
            .or_else(|| parse_datetime(n.date.as_deref()))
            .unwrap_or_else(Utc::now);

        Notification {
            id: n.id.into(),
            title: n.title,
            description: n.description,
            link: n.link,
            category: parse_enum::<Category>(n.kind.as_deref()),
            priority: parse_enum::<Priority>(n.priority.as_deref()),
            icon: n.icon,
            read: n.read.unwrap_or(false),
            created_at,
            expires_at: parse_datetime(n.expires_at.as_deref()),
            action_required: n.action_required,
            metadata: n.metadata.unwrap_or_default(),
        }
    }
}

/// Pushed notifications are always unread.
impl From<PushNotification> for Notification {
    fn from(n: PushNotification) -> Self {
        Notification {
            id: n.notification_id.into(),
            title: n.title,
            description: n.description,
            link: n.link,
            category: parse_enum::<Category>(n.kind.as_deref()),
            priority: parse_enum::<Priority>(n.priority.as_deref()),
            icon: n.icon,
            read: false,
            created_at: parse_datetime(n.timestamp.as_deref()).unwrap_or_else(Utc::now),
            expires_at: None,
            action_required: n.action_required,
            metadata: n.metadata.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn api_notification_defaults() {
        let raw: ApiNotification = serde_json::from_value(json!({
            "_id": "n1",
            "title": "Hello",
            "description": "World",
            "type": "group",
            "priority": "urgent",
            "date": "2026-03-01T08:30:00Z"
        }))
        .unwrap();

        let n = Notification::from(raw);
        assert_eq!(n.id.as_str(), "n1");
        assert!(!n.read);
        assert_eq!(n.category, Some(Category::Group));
        assert_eq!(n.priority, None);
        assert_eq!(n.created_at.to_rfc3339(), "2026-03-01T08:30:00+00:00");
    }

    #[test]
    fn timestamp_wins_over_date() {
        let raw: ApiNotification = serde_json::from_value(json!({
            "_id": "n1",
            "read": true,
            "timestamp": "2026-03-02T00:00:00Z",
            "date": "2026-03-01T00:00:00Z",
            "expiresAt": "2026-04-01T00:00:00Z"
        }))
        .unwrap();

        let n = Notification::from(raw);
        assert!(n.read);
        assert_eq!(n.created_at.to_rfc3339(), "2026-03-02T00:00:00+00:00");
        assert!(n.expires_at.is_some());
    }

    #[test]
    fn pushed_notification_is_unread() {
        let raw: PushNotification = serde_json::from_value(json!({
            "notificationId": "p1",
            "title": "New activity",
            "description": "You were assigned",
            "type": "activity",
            "priority": "high",
            "metadata": { "activityId": "a7" }
        }))
        .unwrap();

        let n = Notification::from(raw);
        assert!(!n.read);
        assert!(n.is_high_priority());
        assert_eq!(n.metadata["activityId"], "a7");
    }
}
