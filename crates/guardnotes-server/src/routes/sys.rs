//! System routes: `/v1/sys/*`.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use serde::Serialize;

use crate::extract::Json;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/sys/health", get(health))
}

/// `GET /v1/sys/health`: liveness check.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
