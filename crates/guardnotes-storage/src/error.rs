//! Storage error types.
//!
//! Every error variant carries enough context to diagnose the problem
//! without a debugger. Uniqueness violations are a dedicated variant so the
//! form layer can turn them into field-level feedback.

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A uniqueness constraint was violated.
    #[error("{entity} with this {field} already exists")]
    Conflict {
        entity: &'static str,
        field: &'static str,
    },

    /// A referenced record does not exist.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Failed to connect to the backend.
    #[error("failed to connect to storage: {reason}")]
    Connect { reason: String },

    /// A query or mutation failed.
    #[error("storage query failed: {reason}")]
    Query { reason: String },

    /// A schema migration failed.
    #[error("migration failed: {reason}")]
    Migration { reason: String },

    /// A stored row could not be decoded into a model.
    #[error("corrupt row in '{table}': {reason}")]
    Corrupt { table: &'static str, reason: String },
}

impl StorageError {
    /// Whether this error is a uniqueness violation on `field`.
    #[must_use]
    pub fn is_conflict_on(&self, field: &str) -> bool {
        matches!(self, Self::Conflict { field: f, .. } if *f == field)
    }
}
