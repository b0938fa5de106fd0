//! Project form.

use guardnotes_storage::{Project, StorageError};

use super::{Dashboard, Saved};
use crate::cache::QueryKey;
use crate::error::FormError;
use crate::notify::NotificationKind;
use crate::validation::{FieldErrors, ProjectInput, validate_project};

impl Dashboard {
    /// Create a project from form input.
    ///
    /// On success the project list is invalidated before returning, and the
    /// result redirects to `/dashboard/{slug}`.
    ///
    /// # Errors
    ///
    /// - [`FormError::Validation`] for invalid input
    /// - [`FormError::Conflict`] on `name` when the derived slug is taken
    /// - [`FormError::InFlight`] if the same project is already being created
    /// - [`FormError::Storage`] for anything else (an error notification is raised)
    pub async fn create_project(&self, input: &ProjectInput) -> Result<Saved<Project>, FormError> {
        let new_project = validate_project(input).map_err(FormError::Validation)?;
        let _submission = self.claim(format!("project:new:{}", new_project.slug))?;

        let slug = new_project.slug.clone();
        let project = match self.repo.create_project(new_project).await {
            Ok(project) => project,
            Err(StorageError::Conflict { .. }) => {
                return Err(FormError::Conflict {
                    fields: FieldErrors::single("name", "project name already exists"),
                });
            }
            Err(e) => {
                tracing::error!(slug = %slug, error = %e, "project creation failed");
                self.notifier.notify(
                    "an error occurred while creating the project",
                    NotificationKind::Error,
                );
                return Err(FormError::Storage(e));
            }
        };

        self.cache.invalidate(&QueryKey::projects()).await;
        tracing::info!(project_id = %project.id, slug = %project.slug, "project created");

        let redirect = format!("/dashboard/{}", project.slug);
        Ok(Saved {
            record: project,
            created: true,
            redirect: Some(redirect),
            reset_form: false,
            close_dialog: false,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use guardnotes_storage::Repository;

    use super::*;
    use crate::dashboard::testing::{blocking_fixture, broken_fixture, fixture};
    use crate::error::ErrorKind;

    fn input(name: &str) -> ProjectInput {
        ProjectInput {
            name: name.to_owned(),
            description: "payments platform".to_owned(),
            image_url: String::new(),
        }
    }

    #[tokio::test]
    async fn create_redirects_to_slug() {
        let fx = fixture();
        let saved = fx.dashboard.create_project(&input("My Cool Project!")).await.unwrap();

        assert_eq!(saved.record.slug, "my-cool-project");
        assert_eq!(saved.redirect.as_deref(), Some("/dashboard/my-cool-project"));
        assert!(saved.created);
        assert!(fx.store.find_project_by_slug("my-cool-project").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn create_invalidates_project_list() {
        let fx = fixture();
        assert!(fx.dashboard.list_projects().await.unwrap().is_empty());
        assert!(fx.dashboard.cache().contains(&QueryKey::projects()).await);

        fx.dashboard.create_project(&input("Atlas")).await.unwrap();
        assert!(!fx.dashboard.cache().contains(&QueryKey::projects()).await);
        assert_eq!(fx.dashboard.list_projects().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn name_mapping_to_existing_slug_conflicts() {
        let fx = fixture();
        fx.dashboard.create_project(&input("My Cool Project")).await.unwrap();

        let err = fx
            .dashboard
            .create_project(&input("my cool project!!"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(
            err.field_errors().unwrap().get("name"),
            Some("project name already exists")
        );
        assert_eq!(fx.store.list_projects().await.unwrap().len(), 1);
        assert!(fx.feed.drain().is_empty());
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_storage() {
        let fx = fixture();
        let err = fx.dashboard.create_project(&input("")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(fx.store.list_projects().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn backend_failure_is_surfaced_as_notification() {
        let fx = broken_fixture();
        let err = fx.dashboard.create_project(&input("Atlas")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Unknown);
        let notes = fx.feed.drain();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn duplicate_create_is_in_flight_until_first_is_cancelled() {
        let (fx, gate) = blocking_fixture();

        let first = tokio::spawn({
            let dashboard = fx.dashboard.clone();
            async move { dashboard.create_project(&input("Atlas")).await }
        });
        gate.entered.await.unwrap();

        let second = fx.dashboard.create_project(&input("atlas")).await;
        assert!(matches!(second, Err(FormError::InFlight)));

        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());
        drop(gate.release);

        let retry = fx.dashboard.create_project(&input("Atlas")).await.unwrap();
        assert_eq!(retry.redirect.as_deref(), Some("/dashboard/atlas"));
        assert_eq!(fx.store.list_projects().await.unwrap().len(), 1);
    }
}
