//! Core library for Guard Notes.
//!
//! Everything between the HTTP layer and the repository: pure validation
//! and identifier derivation, the dashboard form operations with their
//! two-tier error policy, the keyed query cache, user notifications, the
//! duplicate-submission guard, password hashing and the startup bootstrap.

pub mod bootstrap;
pub mod cache;
pub mod dashboard;
pub mod error;
pub mod inflight;
pub mod notify;
pub mod password;
pub mod slug;
pub mod validation;

pub use dashboard::{Dashboard, Saved};
pub use error::{BootstrapError, ErrorKind, FormError, PasswordError};
