//! User-visible notifications.
//!
//! Form operations report outcomes through a [`Notifier`]. Delivery is
//! fire-and-forget: `notify` never fails and never blocks on I/O.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

/// Whether a notification reports success or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

/// A single notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Monotonic sequence number, unique per feed.
    pub id: u64,
    pub message: String,
    pub kind: NotificationKind,
}

/// Sink for user-visible notifications.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, message: &str, kind: NotificationKind);
}

/// A bounded in-memory feed of notifications, drained by the client.
///
/// When full, the oldest notification is dropped.
#[derive(Debug)]
pub struct NotificationFeed {
    capacity: usize,
    queue: Mutex<VecDeque<Notification>>,
    next_id: AtomicU64,
}

impl NotificationFeed {
    /// Create a feed holding at most `capacity` notifications (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            next_id: AtomicU64::new(1),
        }
    }

    /// Remove and return every pending notification, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.drain(..).collect()
    }

    /// Copy of the pending notifications without removing them.
    pub fn pending(&self) -> Vec<Notification> {
        let queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.iter().cloned().collect()
    }
}

impl Notifier for NotificationFeed {
    fn notify(&self, message: &str, kind: NotificationKind) {
        match kind {
            NotificationKind::Success => tracing::info!(message, "notification"),
            NotificationKind::Error => tracing::warn!(message, "notification"),
        }

        let notification = Notification {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            message: message.to_owned(),
            kind,
        };

        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        if queue.len() >= self.capacity {
            queue.pop_front();
        }
        queue.push_back(notification);
    }
}
