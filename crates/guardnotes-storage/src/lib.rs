//! Persistence layer for Guard Notes.
//!
//! This crate defines the [`Repository`] trait (the set of queries and
//! mutations the dashboard needs over users, projects, groups and
//! credentials) and the [`Migrator`] trait used by the bootstrap routine.
//! Uniqueness violations come back as [`StorageError::Conflict`] carrying the
//! entity and field, so callers never inspect error strings.
//!
//! Two implementations are provided:
//!
//! - [`MemoryStore`]: in-memory, for development and tests
//! - [`PostgresStore`]: backed by PostgreSQL via sqlx (feature `postgres-backend`)

mod error;
mod memory;
pub mod model;
#[cfg(feature = "postgres-backend")]
mod postgres_backend;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use model::{
    Environment, Group, GroupDraft, Kv, KvDraft, NewProject, NewUser, Project, Provider, User,
};
#[cfg(feature = "postgres-backend")]
pub use postgres_backend::PostgresStore;

use uuid::Uuid;

/// The persistence operations behind every dashboard form and list view.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
/// Uniqueness constraints enforced by every implementation:
///
/// - `users.username` is unique
/// - `projects.slug` is unique
/// - `groups.name` is unique within a project
#[async_trait::async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Look up a user by username.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Query`] if the backend fails.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;

    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] if the username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError>;

    /// Insert a new project.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] if the slug is taken.
    async fn create_project(&self, project: NewProject) -> Result<Project, StorageError>;

    /// List all projects, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Query`] if the backend fails.
    async fn list_projects(&self) -> Result<Vec<Project>, StorageError>;

    /// Look up a project by its slug.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Query`] if the backend fails.
    async fn find_project_by_slug(&self, slug: &str) -> Result<Option<Project>, StorageError>;

    /// Insert a group into a project.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] if the project already has a group
    /// with that name, [`StorageError::NotFound`] if the project is missing.
    async fn create_group(&self, project_id: Uuid, group: GroupDraft)
    -> Result<Group, StorageError>;

    /// Replace the name, tag and description of group `id` in `project_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if no such group exists in that
    /// project and [`StorageError::Conflict`] if the new name collides there.
    async fn update_group(
        &self,
        project_id: Uuid,
        id: Uuid,
        group: GroupDraft,
    ) -> Result<Group, StorageError>;

    /// Look up a group by ID.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Query`] if the backend fails.
    async fn find_group(&self, id: Uuid) -> Result<Option<Group>, StorageError>;

    /// List the groups of a project ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Query`] if the backend fails.
    async fn list_groups(&self, project_id: Uuid) -> Result<Vec<Group>, StorageError>;

    /// Create a credential, or update the one identified by `id`.
    ///
    /// With `id = None` a new record is appended to the group. With
    /// `id = Some(..)` the existing record is updated in place; it must
    /// belong to `group_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the group or the credential is
    /// missing.
    async fn create_or_update_credential(
        &self,
        id: Option<Uuid>,
        group_id: Uuid,
        kv: KvDraft,
    ) -> Result<Kv, StorageError>;

    /// Look up a credential by ID.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Query`] if the backend fails.
    async fn find_credential(&self, id: Uuid) -> Result<Option<Kv>, StorageError>;

    /// List the credentials of a group ordered by environment, then key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Query`] if the backend fails.
    async fn list_credentials(&self, group_id: Uuid) -> Result<Vec<Kv>, StorageError>;
}

/// Applies pending schema changes to a backend.
#[async_trait::async_trait]
pub trait Migrator: Send + Sync + 'static {
    /// Bring the schema up to date. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Migration`] if any statement fails.
    async fn migrate(&self) -> Result<(), StorageError>;
}
