//! HTTP route handlers.
//!
//! Everything lives under `/v1`:
//!
//! ```text
//! /v1/projects                                  GET, POST
//! /v1/projects/{slug}                           GET
//! /v1/projects/{slug}/groups                    GET, POST
//! /v1/projects/{slug}/groups/{id}               PUT
//! /v1/groups/{group_id}/credentials             GET, POST
//! /v1/groups/{group_id}/credentials/{id}        PUT
//! /v1/groups/{group_id}/credentials/{id}/value  GET
//! /v1/notifications                             GET
//! /v1/sys/health                                GET
//! ```

pub mod credentials;
pub mod groups;
pub mod notifications;
pub mod projects;
pub mod sys;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the Axum router with all routes and middleware.
pub fn app(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(projects::router())
        .merge(groups::router())
        .merge(credentials::router())
        .merge(notifications::router())
        .merge(sys::router());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .nest("/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        // Responses may carry credential values.
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}
