// ── Notification domain model ──
//
// Canonical inbox types. Wire shapes from `notisync_api` are converted
// into these in `crate::convert`; everything downstream of the API layer
// (store, events, CLI output) works only with this module.

pub mod filter;
pub mod notification;

pub use filter::{FilterPatch, NotificationFilter, ReadStatus};
pub use notification::{Category, Notification, NotificationId, Priority};
