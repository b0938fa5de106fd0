//! Guard Notes HTTP server.
//!
//! Wires the dashboard service, storage backend and HTTP routes into a
//! running Axum server. Serves the JSON API at `/v1/*`.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
