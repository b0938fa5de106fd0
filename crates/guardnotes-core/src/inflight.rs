//! Duplicate-submission guard.
//!
//! A form submission claims a key describing what it writes (form kind,
//! scope, record). While the returned [`Submission`] is alive, a second
//! claim on the same key fails. Dropping the submission releases the key,
//! including when the request future is dropped on client disconnect.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Tracks in-flight submissions.
#[derive(Debug, Clone, Default)]
pub struct SubmissionGuard {
    active: Arc<Mutex<HashSet<String>>>,
}

impl SubmissionGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`. Returns `None` if it is already claimed.
    #[must_use]
    pub fn begin(&self, key: impl Into<String>) -> Option<Submission> {
        let key = key.into();
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(key.clone()) {
            tracing::debug!(key = %key, "duplicate submission rejected");
            return None;
        }
        Some(Submission {
            key,
            active: Arc::clone(&self.active),
        })
    }

    /// Whether `key` is currently claimed.
    #[must_use]
    pub fn is_active(&self, key: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

/// A claimed submission; releases its key on drop.
#[derive(Debug)]
pub struct Submission {
    key: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl Drop for Submission {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
