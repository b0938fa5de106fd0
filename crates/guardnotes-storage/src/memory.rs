//! In-memory repository for development and tests.
//!
//! All tables live in a single struct behind a `RwLock`, so every mutation
//! checks its uniqueness constraints and writes under the same lock. Nothing
//! is persisted; all data is lost when the process exits.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::model::{Group, GroupDraft, Kv, KvDraft, NewProject, NewUser, Project, User};
use crate::{Migrator, Repository, StorageError};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    projects: HashMap<Uuid, Project>,
    groups: HashMap<Uuid, Group>,
    kvs: HashMap<Uuid, Kv>,
}

impl Tables {
    fn group_name_taken(&self, project_id: Uuid, name: &str, except: Option<Uuid>) -> bool {
        self.groups
            .values()
            .any(|g| g.project_id == project_id && g.name == name && Some(g.id) != except)
    }
}

/// An in-memory [`Repository`].
///
/// Cloning is cheap and clones share the same tables.
///
/// # Examples
///
/// ```
/// # use guardnotes_storage::{MemoryStore, Repository};
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::new();
/// assert!(store.list_projects().await.unwrap().is_empty());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    migrations: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times [`Migrator::migrate`] has run against this store.
    #[must_use]
    pub fn migration_count(&self) -> usize {
        self.migrations.load(Ordering::SeqCst)
    }

    /// Number of users currently stored.
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }
}

#[async_trait::async_trait]
impl Repository for MemoryStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StorageError::Conflict {
                entity: "user",
                field: "username",
            });
        }

        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            provider: user.provider,
            password_hash: user.password_hash,
            complete_name: user.complete_name,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        tracing::debug!(user_id = %user.id, "memory: user inserted");
        Ok(user)
    }

    async fn create_project(&self, project: NewProject) -> Result<Project, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.projects.values().any(|p| p.slug == project.slug) {
            return Err(StorageError::Conflict {
                entity: "project",
                field: "slug",
            });
        }

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            name: project.name,
            slug: project.slug,
            description: project.description,
            image_url: project.image_url,
            created_at: now,
            updated_at: now,
        };
        tables.projects.insert(project.id, project.clone());
        tracing::debug!(project_id = %project.id, slug = %project.slug, "memory: project inserted");
        Ok(project)
    }

    async fn list_projects(&self) -> Result<Vec<Project>, StorageError> {
        let tables = self.tables.read().await;
        let mut projects: Vec<Project> = tables.projects.values().cloned().collect();
        projects.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.slug.cmp(&b.slug))
        });
        Ok(projects)
    }

    async fn find_project_by_slug(&self, slug: &str) -> Result<Option<Project>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.projects.values().find(|p| p.slug == slug).cloned())
    }

    async fn create_group(
        &self,
        project_id: Uuid,
        group: GroupDraft,
    ) -> Result<Group, StorageError> {
        let mut tables = self.tables.write().await;
        if !tables.projects.contains_key(&project_id) {
            return Err(StorageError::NotFound {
                entity: "project",
                id: project_id.to_string(),
            });
        }
        if tables.group_name_taken(project_id, &group.name, None) {
            return Err(StorageError::Conflict {
                entity: "group",
                field: "name",
            });
        }

        let now = Utc::now();
        let group = Group {
            id: Uuid::new_v4(),
            project_id,
            name: group.name,
            tag: group.tag,
            description: group.description,
            created_at: now,
            updated_at: now,
        };
        tables.groups.insert(group.id, group.clone());
        tracing::debug!(group_id = %group.id, project_id = %project_id, "memory: group inserted");
        Ok(group)
    }

    async fn update_group(
        &self,
        project_id: Uuid,
        id: Uuid,
        group: GroupDraft,
    ) -> Result<Group, StorageError> {
        let mut tables = self.tables.write().await;
        if !tables
            .groups
            .get(&id)
            .is_some_and(|g| g.project_id == project_id)
        {
            tracing::debug!(group_id = %id, project_id = %project_id, "memory: group not in project");
            return Err(StorageError::NotFound {
                entity: "group",
                id: id.to_string(),
            });
        }
        if tables.group_name_taken(project_id, &group.name, Some(id)) {
            return Err(StorageError::Conflict {
                entity: "group",
                field: "name",
            });
        }

        let existing = tables
            .groups
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound {
                entity: "group",
                id: id.to_string(),
            })?;
        existing.name = group.name;
        existing.tag = group.tag;
        existing.description = group.description;
        existing.updated_at = Utc::now();
        tracing::debug!(group_id = %id, "memory: group updated");
        Ok(existing.clone())
    }

    async fn find_group(&self, id: Uuid) -> Result<Option<Group>, StorageError> {
        Ok(self.tables.read().await.groups.get(&id).cloned())
    }

    async fn list_groups(&self, project_id: Uuid) -> Result<Vec<Group>, StorageError> {
        let tables = self.tables.read().await;
        let mut groups: Vec<Group> = tables
            .groups
            .values()
            .filter(|g| g.project_id == project_id)
            .cloned()
            .collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    async fn create_or_update_credential(
        &self,
        id: Option<Uuid>,
        group_id: Uuid,
        kv: KvDraft,
    ) -> Result<Kv, StorageError> {
        let mut tables = self.tables.write().await;
        if !tables.groups.contains_key(&group_id) {
            return Err(StorageError::NotFound {
                entity: "group",
                id: group_id.to_string(),
            });
        }

        let now = Utc::now();
        if let Some(id) = id {
            let existing = tables
                .kvs
                .get_mut(&id)
                .filter(|existing| existing.group_id == group_id)
                .ok_or_else(|| StorageError::NotFound {
                    entity: "credential",
                    id: id.to_string(),
                })?;
            existing.key = kv.key;
            existing.value = kv.value;
            existing.environment = kv.environment;
            existing.updated_at = now;
            tracing::debug!(credential_id = %id, group_id = %group_id, "memory: credential updated");
            return Ok(existing.clone());
        }

        let created = Kv {
            id: Uuid::new_v4(),
            group_id,
            key: kv.key,
            value: kv.value,
            environment: kv.environment,
            created_at: now,
            updated_at: now,
        };
        tables.kvs.insert(created.id, created.clone());
        tracing::debug!(credential_id = %created.id, group_id = %group_id, "memory: credential inserted");
        Ok(created)
    }

    async fn find_credential(&self, id: Uuid) -> Result<Option<Kv>, StorageError> {
        Ok(self.tables.read().await.kvs.get(&id).cloned())
    }

    async fn list_credentials(&self, group_id: Uuid) -> Result<Vec<Kv>, StorageError> {
        let tables = self.tables.read().await;
        let mut kvs: Vec<Kv> = tables
            .kvs
            .values()
            .filter(|kv| kv.group_id == group_id)
            .cloned()
            .collect();
        kvs.sort_by(|a, b| {
            a.environment
                .cmp(&b.environment)
                .then_with(|| a.key.cmp(&b.key))
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(kvs)
    }
}

#[async_trait::async_trait]
impl Migrator for MemoryStore {
    async fn migrate(&self) -> Result<(), StorageError> {
        let run = self.migrations.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(run, "memory: nothing to migrate");
        Ok(())
    }
}
