//! Credential routes, scoped to a group.
//!
//! Values are masked in every response except the explicit reveal
//! endpoint and list requests with `?reveal=true`. Reveals are logged.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use guardnotes_core::Saved;
use guardnotes_core::validation::CredentialInput;
use guardnotes_storage::{Environment, Kv};

use crate::error::AppError;
use crate::extract::Json;
use crate::state::AppState;

/// Placeholder returned instead of a secret value.
pub const MASK: &str = "********";

/// A credential as returned over HTTP.
#[derive(Debug, Serialize)]
pub struct CredentialView {
    pub id: Uuid,
    pub group_id: Uuid,
    pub key: String,
    pub value: String,
    pub masked: bool,
    pub environment: Environment,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CredentialView {
    fn new(kv: Kv, reveal: bool) -> Self {
        Self {
            id: kv.id,
            group_id: kv.group_id,
            key: kv.key,
            value: if reveal { kv.value } else { MASK.to_owned() },
            masked: !reveal,
            environment: kv.environment,
            created_at: kv.created_at,
            updated_at: kv.updated_at,
        }
    }

    fn masked(kv: Kv) -> Self {
        Self::new(kv, false)
    }
}

/// Response for credential listing.
#[derive(Debug, Serialize)]
pub struct CredentialListResponse {
    pub credentials: Vec<CredentialView>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub reveal: bool,
}

/// Build the credentials router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/groups/{group_id}/credentials",
            get(list_credentials).post(create_credential),
        )
        .route("/groups/{group_id}/credentials/{id}", put(update_credential))
        .route(
            "/groups/{group_id}/credentials/{id}/value",
            get(reveal_credential),
        )
}

/// `GET /v1/groups/{group_id}/credentials`: list a group's credentials.
async fn list_credentials(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> Result<Json<CredentialListResponse>, AppError> {
    if state.dashboard.find_group(group_id).await?.is_none() {
        return Err(AppError::NotFound(format!("group '{group_id}' not found")));
    }

    let credentials = state.dashboard.list_credentials(group_id).await?;
    if params.reveal {
        tracing::info!(group_id = %group_id, count = credentials.len(), "credential values revealed");
    }

    Ok(Json(CredentialListResponse {
        credentials: credentials
            .into_iter()
            .map(|kv| CredentialView::new(kv, params.reveal))
            .collect(),
    }))
}

/// `POST /v1/groups/{group_id}/credentials`: add a credential.
async fn create_credential(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
    Json(body): Json<CredentialInput>,
) -> Result<(StatusCode, Json<Saved<CredentialView>>), AppError> {
    let saved = state
        .dashboard
        .save_credential(group_id, None, &body)
        .await?;
    Ok((StatusCode::CREATED, Json(saved.map(CredentialView::masked))))
}

/// `PUT /v1/groups/{group_id}/credentials/{id}`: update a credential in place.
async fn update_credential(
    State(state): State<Arc<AppState>>,
    Path((group_id, id)): Path<(Uuid, Uuid)>,
    Json(body): Json<CredentialInput>,
) -> Result<Json<Saved<CredentialView>>, AppError> {
    let saved = state
        .dashboard
        .save_credential(group_id, Some(id), &body)
        .await?;
    Ok(Json(saved.map(CredentialView::masked)))
}

/// `GET /v1/groups/{group_id}/credentials/{id}/value`: reveal one value.
async fn reveal_credential(
    State(state): State<Arc<AppState>>,
    Path((group_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CredentialView>, AppError> {
    let kv = state
        .dashboard
        .find_credential(id)
        .await?
        .filter(|kv| kv.group_id == group_id)
        .ok_or_else(|| AppError::NotFound(format!("credential '{id}' not found")))?;

    tracing::info!(credential_id = %id, group_id = %group_id, "credential value revealed");
    Ok(Json(CredentialView::new(kv, true)))
}
