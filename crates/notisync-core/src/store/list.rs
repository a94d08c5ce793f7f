// ── Ordered, de-duplicated notification list ──
//
// Insertion-ordered map keyed by id. Page loads append in server order,
// pushed entries are prepended, and an update to a known id keeps its
// position. Unread count is always recomputed, never tracked.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::model::{Notification, NotificationId};

#[derive(Debug, Default)]
pub(crate) struct NotificationList {
    entries: IndexMap<NotificationId, Arc<Notification>>,
}

impl NotificationList {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn get(&self, id: &NotificationId) -> Option<&Arc<Notification>> {
        self.entries.get(id)
    }

    pub(crate) fn unread_count(&self) -> usize {
        self.entries.values().filter(|n| !n.read).count()
    }

    /// Entries in display order.
    pub(crate) fn snapshot(&self) -> Vec<Arc<Notification>> {
        self.entries.values().cloned().collect()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replace everything with one page, in server order.
    pub(crate) fn replace_all(&mut self, page: impl IntoIterator<Item = Notification>) {
        self.entries.clear();
        self.append(page);
    }

    /// Append a page. Ids already present are updated where they stand.
    pub(crate) fn append(&mut self, page: impl IntoIterator<Item = Notification>) {
        for notification in page {
            // `insert` keeps the slot of an existing key.
            self.entries
                .insert(notification.id.clone(), Arc::new(notification));
        }
    }

    /// Put a new entry first. Returns `false` if the id is already loaded.
    pub(crate) fn prepend(&mut self, notification: Arc<Notification>) -> bool {
        if self.entries.contains_key(&notification.id) {
            return false;
        }
        self.entries
            .shift_insert(0, notification.id.clone(), notification);
        true
    }

    /// Replace a loaded entry in place. Returns `true` if anything changed.
    pub(crate) fn replace(&mut self, notification: Notification) -> bool {
        match self.entries.get_mut(&notification.id) {
            Some(slot) if **slot != notification => {
                *slot = Arc::new(notification);
                true
            }
            _ => false,
        }
    }

    /// Returns `true` if the flag actually flipped.
    pub(crate) fn set_read(&mut self, id: &NotificationId, read: bool) -> bool {
        match self.entries.get_mut(id) {
            Some(slot) if slot.read != read => {
                Arc::make_mut(slot).read = read;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn mark_all_read(&mut self) -> bool {
        let mut changed = false;
        for slot in self.entries.values_mut() {
            if !slot.read {
                Arc::make_mut(slot).read = true;
                changed = true;
            }
        }
        changed
    }

    /// Remove without disturbing the order of the rest.
    pub(crate) fn remove(&mut self, id: &NotificationId) -> Option<Arc<Notification>> {
        self.entries.shift_remove(id)
    }
}
