// ── Typed push events and store changes ──
//
// `ServerEvent` is the closed set of push events the engine understands.
// Both push events and local mutation acknowledgements reduce to a
// `Change`, the single input of the store's merge function.

use serde::de::DeserializeOwned;
use tracing::debug;

use notisync_api::{NotificationRef, PushFrame, PushNotification};

use crate::error::CoreError;
use crate::model::{Notification, NotificationId, Priority};

/// An inbound push event.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    NewNotification(Notification),
    HighPriorityNotification(Notification),
    NotificationRead(NotificationId),
    NotificationUnread(NotificationId),
    NotificationDeleted(NotificationId),
    AllRead,
    AllCleared,
    /// Domain trigger that only asks for a reload of the current window.
    RefreshRequired { reason: String },
}

impl ServerEvent {
    /// Decode a push frame.
    ///
    /// Heartbeat responses and unknown event names yield `Ok(None)`; a known
    /// name whose payload does not decode is a `MalformedEvent` error.
    pub fn from_frame(frame: &PushFrame) -> Result<Option<Self>, CoreError> {
        let event = match frame.event.as_str() {
            "new-notification" => {
                Self::NewNotification(decode::<PushNotification>(frame)?.into())
            }
            "high-priority-notification" => {
                let mut notification: Notification = decode::<PushNotification>(frame)?.into();
                notification.priority.get_or_insert(Priority::High);
                Self::HighPriorityNotification(notification)
            }
            "notification-read" => Self::NotificationRead(decode_ref(frame)?),
            "notification-unread" => Self::NotificationUnread(decode_ref(frame)?),
            "notification-deleted" => Self::NotificationDeleted(decode_ref(frame)?),
            "all-notifications-read" | "all-read" => Self::AllRead,
            "notifications-cleared" => Self::AllCleared,
            "new-activity-assignment" | "activity-belbin-status-updated" => {
                Self::RefreshRequired {
                    reason: frame.event.clone(),
                }
            }
            "pong" => return Ok(None),
            other => {
                debug!(event = other, "Ignoring unknown push event");
                return Ok(None);
            }
        };
        Ok(Some(event))
    }

    /// The store change this event implies, if any.
    pub fn change(&self) -> Option<Change> {
        match self {
            Self::NewNotification(n) | Self::HighPriorityNotification(n) => {
                Some(Change::Upsert(n.clone()))
            }
            Self::NotificationRead(id) => Some(Change::Read(id.clone())),
            Self::NotificationUnread(id) => Some(Change::Unread(id.clone())),
            Self::NotificationDeleted(id) => Some(Change::Removed(id.clone())),
            Self::AllRead => Some(Change::AllRead),
            Self::AllCleared => Some(Change::Cleared),
            Self::RefreshRequired { .. } => None,
        }
    }
}

fn decode<T: DeserializeOwned>(frame: &PushFrame) -> Result<T, CoreError> {
    serde_json::from_value(frame.data.clone()).map_err(|e| CoreError::MalformedEvent {
        event: frame.event.clone(),
        message: e.to_string(),
    })
}

fn decode_ref(frame: &PushFrame) -> Result<NotificationId, CoreError> {
    decode::<NotificationRef>(frame).map(|r| r.notification_id.into())
}

/// A state transition applied by the store's merge function.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Upsert(Notification),
    Read(NotificationId),
    Unread(NotificationId),
    Removed(NotificationId),
    AllRead,
    Cleared,
}
