//! Dashboard service.
//!
//! [`Dashboard`] bundles the injected collaborators (repository, query
//! cache, notifier and submission guard) and exposes one method per form
//! plus the cached list queries the views read. Form methods follow a single
//! policy:
//!
//! - validation and uniqueness failures come back as field errors, with no
//!   notification
//! - every other failure raises a generic error notification
//! - success invalidates the dependent list keys before returning
//!
//! ```text
//! Dashboard
//!   ├── create_project   → ["projects-selector"]
//!   ├── save_group       → ["groups", <project slug>]
//!   └── save_credential  → ["credentials", {"group": <group id>}]
//! ```

mod credential;
mod group;
mod project;

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use guardnotes_storage::{Group, Kv, Project, Repository, StorageError};

use crate::cache::{QueryCache, QueryKey};
use crate::error::FormError;
use crate::inflight::{Submission, SubmissionGuard};
use crate::notify::Notifier;

/// Result of a successful form submission, with the follow-up the client
/// should perform.
#[derive(Debug, Clone, Serialize)]
pub struct Saved<T> {
    pub record: T,
    /// `true` for a new record, `false` for an update.
    pub created: bool,
    /// Where to navigate next, if anywhere.
    pub redirect: Option<String>,
    pub reset_form: bool,
    pub close_dialog: bool,
}

impl<T> Saved<T> {
    /// Transform the record, keeping the follow-up flags.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Saved<U> {
        Saved {
            record: f(self.record),
            created: self.created,
            redirect: self.redirect,
            reset_form: self.reset_form,
            close_dialog: self.close_dialog,
        }
    }
}

/// Form operations and cached list queries over an injected repository.
#[derive(Clone)]
pub struct Dashboard {
    repo: Arc<dyn Repository>,
    cache: Arc<QueryCache>,
    notifier: Arc<dyn Notifier>,
    submissions: SubmissionGuard,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard").finish_non_exhaustive()
    }
}

impl Dashboard {
    #[must_use]
    pub fn new(
        repo: Arc<dyn Repository>,
        cache: Arc<QueryCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            repo,
            cache,
            notifier,
            submissions: SubmissionGuard::new(),
        }
    }

    /// The query cache shared with the views.
    #[must_use]
    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    fn claim(&self, key: String) -> Result<Submission, FormError> {
        self.submissions.begin(key).ok_or(FormError::InFlight)
    }

    // ── Read side ────────────────────────────────────────────────────

    /// All projects, newest first. Cached under `["projects-selector"]`.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the list cannot be loaded.
    pub async fn list_projects(&self) -> Result<Vec<Project>, StorageError> {
        let repo = Arc::clone(&self.repo);
        self.cache
            .get_or_fetch(QueryKey::projects(), || async move { repo.list_projects().await })
            .await
    }

    /// Look up a project by slug (uncached).
    ///
    /// # Errors
    ///
    /// Returns the storage error if the lookup fails.
    pub async fn find_project(&self, slug: &str) -> Result<Option<Project>, StorageError> {
        self.repo.find_project_by_slug(slug).await
    }

    /// Groups of a project. Cached under `["groups", <slug>]`.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the list cannot be loaded.
    pub async fn list_groups(&self, project: &Project) -> Result<Vec<Group>, StorageError> {
        let repo = Arc::clone(&self.repo);
        let project_id = project.id;
        self.cache
            .get_or_fetch(QueryKey::groups(&project.slug), || async move {
                repo.list_groups(project_id).await
            })
            .await
    }

    /// Look up a group by ID (uncached).
    ///
    /// # Errors
    ///
    /// Returns the storage error if the lookup fails.
    pub async fn find_group(&self, id: Uuid) -> Result<Option<Group>, StorageError> {
        self.repo.find_group(id).await
    }

    /// Credentials of a group, values included. Cached under
    /// `["credentials", {"group": <id>}]`.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the list cannot be loaded.
    pub async fn list_credentials(&self, group_id: Uuid) -> Result<Vec<Kv>, StorageError> {
        let repo = Arc::clone(&self.repo);
        self.cache
            .get_or_fetch(QueryKey::credentials(group_id), || async move {
                repo.list_credentials(group_id).await
            })
            .await
    }

    /// Look up a credential by ID (uncached).
    ///
    /// # Errors
    ///
    /// Returns the storage error if the lookup fails.
    pub async fn find_credential(&self, id: Uuid) -> Result<Option<Kv>, StorageError> {
        self.repo.find_credential(id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing {
    //! Shared fixtures for the form tests.

    use std::sync::{Arc, Mutex};

    use tokio::sync::oneshot;
    use uuid::Uuid;

    use guardnotes_storage::{
        Group, GroupDraft, Kv, KvDraft, MemoryStore, NewProject, NewUser, Project, Repository,
        StorageError, User,
    };

    use super::Dashboard;
    use crate::cache::QueryCache;
    use crate::notify::NotificationFeed;

    pub(crate) struct Fixture {
        pub dashboard: Dashboard,
        pub store: MemoryStore,
        pub feed: Arc<NotificationFeed>,
    }

    pub(crate) fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let feed = Arc::new(NotificationFeed::new(32));
        let dashboard = Dashboard::new(
            Arc::new(store.clone()),
            Arc::new(QueryCache::new()),
            Arc::clone(&feed) as Arc<dyn crate::notify::Notifier>,
        );
        Fixture {
            dashboard,
            store,
            feed,
        }
    }

    /// Reads go to the inner store; every write fails with a backend error.
    pub(crate) struct BrokenWrites(pub MemoryStore);

    fn down() -> StorageError {
        StorageError::Query {
            reason: "connection reset by peer".to_owned(),
        }
    }

    #[async_trait::async_trait]
    impl Repository for BrokenWrites {
        async fn find_user_by_username(
            &self,
            username: &str,
        ) -> Result<Option<User>, StorageError> {
            self.0.find_user_by_username(username).await
        }

        async fn create_user(&self, _user: NewUser) -> Result<User, StorageError> {
            Err(down())
        }

        async fn create_project(&self, _project: NewProject) -> Result<Project, StorageError> {
            Err(down())
        }

        async fn list_projects(&self) -> Result<Vec<Project>, StorageError> {
            self.0.list_projects().await
        }

        async fn find_project_by_slug(&self, slug: &str) -> Result<Option<Project>, StorageError> {
            self.0.find_project_by_slug(slug).await
        }

        async fn create_group(
            &self,
            _project_id: Uuid,
            _group: GroupDraft,
        ) -> Result<Group, StorageError> {
            Err(down())
        }

        async fn update_group(
            &self,
            _project_id: Uuid,
            _id: Uuid,
            _group: GroupDraft,
        ) -> Result<Group, StorageError> {
            Err(down())
        }

        async fn find_group(&self, id: Uuid) -> Result<Option<Group>, StorageError> {
            self.0.find_group(id).await
        }

        async fn list_groups(&self, project_id: Uuid) -> Result<Vec<Group>, StorageError> {
            self.0.list_groups(project_id).await
        }

        async fn create_or_update_credential(
            &self,
            _id: Option<Uuid>,
            _group_id: Uuid,
            _kv: KvDraft,
        ) -> Result<Kv, StorageError> {
            Err(down())
        }

        async fn find_credential(&self, id: Uuid) -> Result<Option<Kv>, StorageError> {
            self.0.find_credential(id).await
        }

        async fn list_credentials(&self, group_id: Uuid) -> Result<Vec<Kv>, StorageError> {
            self.0.list_credentials(group_id).await
        }
    }

    pub(crate) fn broken_fixture() -> Fixture {
        let store = MemoryStore::new();
        let feed = Arc::new(NotificationFeed::new(32));
        let dashboard = Dashboard::new(
            Arc::new(BrokenWrites(store.clone())),
            Arc::new(QueryCache::new()),
            Arc::clone(&feed) as Arc<dyn crate::notify::Notifier>,
        );
        Fixture {
            dashboard,
            store,
            feed,
        }
    }

    /// Handles a test uses to drive a [`BlockingWrites`] repository.
    pub(crate) struct Gate {
        /// Fires once the first write has been entered.
        pub entered: oneshot::Receiver<()>,
        /// Lets the first write through. Dropping it does too.
        pub release: oneshot::Sender<()>,
    }

    /// The first write parks on a oneshot until released; later writes and
    /// all reads go straight to the inner store.
    pub(crate) struct BlockingWrites {
        inner: MemoryStore,
        gate: Mutex<Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>>,
    }

    impl BlockingWrites {
        async fn pass(&self) {
            let gate = self.gate.lock().unwrap().take();
            if let Some((entered, release)) = gate {
                let _ = entered.send(());
                let _ = release.await;
            }
        }
    }

    #[async_trait::async_trait]
    impl Repository for BlockingWrites {
        async fn find_user_by_username(
            &self,
            username: &str,
        ) -> Result<Option<User>, StorageError> {
            self.inner.find_user_by_username(username).await
        }

        async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
            self.pass().await;
            self.inner.create_user(user).await
        }

        async fn create_project(&self, project: NewProject) -> Result<Project, StorageError> {
            self.pass().await;
            self.inner.create_project(project).await
        }

        async fn list_projects(&self) -> Result<Vec<Project>, StorageError> {
            self.inner.list_projects().await
        }

        async fn find_project_by_slug(&self, slug: &str) -> Result<Option<Project>, StorageError> {
            self.inner.find_project_by_slug(slug).await
        }

        async fn create_group(
            &self,
            project_id: Uuid,
            group: GroupDraft,
        ) -> Result<Group, StorageError> {
            self.pass().await;
            self.inner.create_group(project_id, group).await
        }

        async fn update_group(
            &self,
            project_id: Uuid,
            id: Uuid,
            group: GroupDraft,
        ) -> Result<Group, StorageError> {
            self.pass().await;
            self.inner.update_group(project_id, id, group).await
        }

        async fn find_group(&self, id: Uuid) -> Result<Option<Group>, StorageError> {
            self.inner.find_group(id).await
        }

        async fn list_groups(&self, project_id: Uuid) -> Result<Vec<Group>, StorageError> {
            self.inner.list_groups(project_id).await
        }

        async fn create_or_update_credential(
            &self,
            id: Option<Uuid>,
            group_id: Uuid,
            kv: KvDraft,
        ) -> Result<Kv, StorageError> {
            self.pass().await;
            self.inner.create_or_update_credential(id, group_id, kv).await
        }

        async fn find_credential(&self, id: Uuid) -> Result<Option<Kv>, StorageError> {
            self.inner.find_credential(id).await
        }

        async fn list_credentials(&self, group_id: Uuid) -> Result<Vec<Kv>, StorageError> {
            self.inner.list_credentials(group_id).await
        }
    }

    pub(crate) fn blocking_fixture() -> (Fixture, Gate) {
        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        let store = MemoryStore::new();
        let feed = Arc::new(NotificationFeed::new(32));
        let repo = BlockingWrites {
            inner: store.clone(),
            gate: Mutex::new(Some((entered_tx, release_rx))),
        };
        let dashboard = Dashboard::new(
            Arc::new(repo),
            Arc::new(QueryCache::new()),
            Arc::clone(&feed) as Arc<dyn crate::notify::Notifier>,
        );
        let fixture = Fixture {
            dashboard,
            store,
            feed,
        };
        let gate = Gate {
            entered: entered_rx,
            release: release_tx,
        };
        (fixture, gate)
    }
}
