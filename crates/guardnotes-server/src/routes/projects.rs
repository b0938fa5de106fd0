//! Project routes.
//!
//! Creating a project derives its slug from the name and answers with the
//! dashboard URL the client should navigate to.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use guardnotes_core::Saved;
use guardnotes_core::validation::ProjectInput;
use guardnotes_storage::Project;

use crate::error::AppError;
use crate::extract::Json;
use crate::state::AppState;

/// Response for project listing.
#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub projects: Vec<Project>,
}

/// Build the projects router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/{slug}", get(get_project))
}

/// `GET /v1/projects`: list projects, newest first.
async fn list_projects(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProjectListResponse>, AppError> {
    let projects = state.dashboard.list_projects().await?;
    Ok(Json(ProjectListResponse { projects }))
}

/// `POST /v1/projects`: create a project.
async fn create_project(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ProjectInput>,
) -> Result<(StatusCode, Json<Saved<Project>>), AppError> {
    let saved = state.dashboard.create_project(&body).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// `GET /v1/projects/{slug}`: get one project.
async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Project>, AppError> {
    state
        .dashboard
        .find_project(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("project '{slug}' not found")))
}
