//! Shared application state for the Guard Notes server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`.

use std::sync::Arc;

use guardnotes_core::Dashboard;
use guardnotes_core::cache::QueryCache;
use guardnotes_core::notify::{NotificationFeed, Notifier};
use guardnotes_storage::Repository;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Form operations and cached list queries.
    pub dashboard: Dashboard,
    /// Pending user notifications, drained by `GET /v1/notifications`.
    pub notifications: Arc<NotificationFeed>,
}

impl AppState {
    /// Wire a dashboard over `repo` with a fresh cache and a notification
    /// feed holding at most `notification_capacity` entries.
    #[must_use]
    pub fn new(repo: Arc<dyn Repository>, notification_capacity: usize) -> Self {
        let notifications = Arc::new(NotificationFeed::new(notification_capacity));
        let dashboard = Dashboard::new(
            repo,
            Arc::new(QueryCache::new()),
            Arc::clone(&notifications) as Arc<dyn Notifier>,
        );
        Self {
            dashboard,
            notifications,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
