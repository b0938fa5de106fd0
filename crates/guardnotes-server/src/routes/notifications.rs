//! Notification feed: `/v1/notifications`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use guardnotes_core::notify::Notification;

use crate::extract::Json;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    /// Read without consuming.
    #[serde(default)]
    pub peek: bool,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/notifications", get(list_notifications))
}

/// `GET /v1/notifications`: return pending notifications, oldest first,
/// and clear them unless `?peek=true`.
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeedParams>,
) -> Json<NotificationListResponse> {
    let notifications = if params.peek {
        state.notifications.pending()
    } else {
        state.notifications.drain()
    };
    Json(NotificationListResponse { notifications })
}
