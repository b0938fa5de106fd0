//! Error types for `guardnotes-core`.
//!
//! Every form operation normalizes its failures into [`FormError`], whose
//! [`ErrorKind`] drives one two-tier policy: validation and conflict errors
//! become field-level feedback, everything else a generic notification.

use guardnotes_storage::StorageError;

use crate::validation::FieldErrors;

/// Coarse classification of a form failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Input failed validation.
    Validation,
    /// Input collided with an existing record.
    Conflict,
    /// Anything else.
    Unknown,
}

/// Errors from dashboard form operations.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    /// One or more fields failed validation.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// A uniqueness constraint was violated; `fields` says where to show it.
    #[error("conflict: {fields}")]
    Conflict { fields: FieldErrors },

    /// The operation needs an active project and none was supplied.
    #[error("no active project")]
    NoProject,

    /// An identical submission is already being processed.
    #[error("submission already in progress")]
    InFlight,

    /// Persistence failed for a reason the form cannot fix.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl FormError {
    /// The tier this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict { .. } | Self::InFlight => ErrorKind::Conflict,
            Self::NoProject | Self::Storage(_) => ErrorKind::Unknown,
        }
    }

    /// Field-level messages, if this error carries any.
    #[must_use]
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(fields) | Self::Conflict { fields } => Some(fields),
            Self::NoProject | Self::InFlight | Self::Storage(_) => None,
        }
    }
}

/// Errors from password hashing.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Hashing failed (salt generation or the KDF itself).
    #[error("password hashing failed: {reason}")]
    Hash { reason: String },

    /// The stored hash is not a valid PHC string.
    #[error("invalid password hash: {reason}")]
    InvalidHash { reason: String },
}

/// Errors from the bootstrap routine.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Applying migrations failed. Fatal.
    #[error("migration failed: {0}")]
    Migration(#[source] StorageError),

    /// Hashing the default password failed.
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Looking up or creating the default user failed.
    #[error("storage error: {0}")]
    Storage(#[source] StorageError),
}
