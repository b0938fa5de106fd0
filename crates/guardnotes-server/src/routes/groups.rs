//! Group routes, scoped to a project slug.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::Router;
use serde::Serialize;
use uuid::Uuid;

use guardnotes_core::Saved;
use guardnotes_core::validation::GroupInput;
use guardnotes_storage::{Group, Project};

use crate::error::AppError;
use crate::extract::Json;
use crate::state::AppState;

/// Response for group listing.
#[derive(Debug, Serialize)]
pub struct GroupListResponse {
    pub groups: Vec<Group>,
}

/// Build the groups router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/projects/{slug}/groups",
            get(list_groups).post(create_group),
        )
        .route("/projects/{slug}/groups/{id}", put(update_group))
}

async fn require_project(state: &AppState, slug: &str) -> Result<Project, AppError> {
    state
        .dashboard
        .find_project(slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("project '{slug}' not found")))
}

/// `GET /v1/projects/{slug}/groups`: list the project's groups by name.
async fn list_groups(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<GroupListResponse>, AppError> {
    let project = require_project(&state, &slug).await?;
    let groups = state.dashboard.list_groups(&project).await?;
    Ok(Json(GroupListResponse { groups }))
}

/// `POST /v1/projects/{slug}/groups`: create a group.
///
/// An unknown slug is the "no active project" case: the dashboard raises
/// its error notification and the request answers 404.
async fn create_group(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(body): Json<GroupInput>,
) -> Result<(StatusCode, Json<Saved<Group>>), AppError> {
    let project = state.dashboard.find_project(&slug).await?;
    let saved = state
        .dashboard
        .save_group(project.as_ref(), None, &body)
        .await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// `PUT /v1/projects/{slug}/groups/{id}`: rename or re-describe a group.
async fn update_group(
    State(state): State<Arc<AppState>>,
    Path((slug, id)): Path<(String, Uuid)>,
    Json(body): Json<GroupInput>,
) -> Result<Json<Saved<Group>>, AppError> {
    let project = require_project(&state, &slug).await?;

    // A group ID from another project is treated as missing.
    match state.dashboard.find_group(id).await? {
        Some(group) if group.project_id == project.id => {}
        _ => return Err(AppError::NotFound(format!("group '{id}' not found"))),
    }

    let saved = state
        .dashboard
        .save_group(Some(&project), Some(id), &body)
        .await?;
    Ok(Json(saved))
}
