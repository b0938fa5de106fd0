//! HTTP error types for the Guard Notes server.
//!
//! Maps domain errors from `guardnotes-core` and `guardnotes-storage` into
//! HTTP responses. Every variant produces a JSON body with a machine-readable
//! `error` field and a human-readable `message`; field-level failures also
//! carry a `fields` map the form can render next to each input.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use guardnotes_core::FormError;
use guardnotes_core::validation::FieldErrors;
use guardnotes_storage::StorageError;

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Requested resource not found.
    NotFound(String),
    /// Client sent invalid input.
    BadRequest(String),
    /// One or more form fields failed validation.
    Validation(FieldErrors),
    /// A uniqueness conflict or a duplicate in-flight submission.
    Conflict {
        message: String,
        fields: Option<FieldErrors>,
    },
    /// Internal server error. The message is logged, never returned.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FieldErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message, fields) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            Self::Validation(fields) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation",
                fields.to_string(),
                Some(fields),
            ),
            Self::Conflict { message, fields } => {
                (StatusCode::CONFLICT, "conflict", message, fields)
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "an internal error occurred".to_owned(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: error_type,
            message,
            fields,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { .. } => Self::NotFound(err.to_string()),
            StorageError::Conflict { .. } => Self::Conflict {
                message: err.to_string(),
                fields: None,
            },
            StorageError::Connect { .. }
            | StorageError::Query { .. }
            | StorageError::Migration { .. }
            | StorageError::Corrupt { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<FormError> for AppError {
    fn from(err: FormError) -> Self {
        match err {
            FormError::Validation(fields) => Self::Validation(fields),
            FormError::Conflict { fields } => Self::Conflict {
                message: fields.to_string(),
                fields: Some(fields),
            },
            FormError::InFlight => Self::Conflict {
                message: err.to_string(),
                fields: None,
            },
            FormError::NoProject => Self::NotFound("project not found".to_owned()),
            FormError::Storage(inner) => inner.into(),
        }
    }
}
