//! Group form.

use uuid::Uuid;

use guardnotes_storage::{Group, Project, StorageError};

use super::{Dashboard, Saved};
use crate::cache::QueryKey;
use crate::error::FormError;
use crate::notify::NotificationKind;
use crate::validation::{FieldErrors, GroupInput, validate_group};

impl Dashboard {
    /// Create a group in `project`, or edit the group `id` when given.
    ///
    /// Without an active project nothing is written and an error
    /// notification is raised. On success a notification is raised and the
    /// project's group list is invalidated.
    ///
    /// # Errors
    ///
    /// - [`FormError::NoProject`] when `project` is `None`
    /// - [`FormError::Validation`] for invalid input
    /// - [`FormError::Conflict`] on `name` when the project already has it
    /// - [`FormError::InFlight`] for a duplicate concurrent submission
    /// - [`FormError::Storage`] for anything else, including an `id` that is
    ///   not a group of `project` (an error notification is raised)
    pub async fn save_group(
        &self,
        project: Option<&Project>,
        id: Option<Uuid>,
        input: &GroupInput,
    ) -> Result<Saved<Group>, FormError> {
        let Some(project) = project else {
            self.notifier
                .notify("could not create the group", NotificationKind::Error);
            return Err(FormError::NoProject);
        };

        let draft = validate_group(input).map_err(FormError::Validation)?;
        let target = id.map_or_else(|| format!("new:{}", draft.name), |id| id.to_string());
        let _submission = self.claim(format!("group:{}:{target}", project.id))?;

        let result = match id {
            Some(id) => self.repo.update_group(project.id, id, draft).await,
            None => self.repo.create_group(project.id, draft).await,
        };

        let group = match result {
            Ok(group) => group,
            Err(e) if e.is_conflict_on("name") => {
                return Err(FormError::Conflict {
                    fields: FieldErrors::single("name", "group name already exists"),
                });
            }
            Err(e) => return Err(self.group_failed(project, e)),
        };

        let created = id.is_none();
        self.notifier.notify(
            if created {
                "group created successfully"
            } else {
                "group updated successfully"
            },
            NotificationKind::Success,
        );
        self.cache.invalidate(&QueryKey::groups(&project.slug)).await;
        tracing::info!(group_id = %group.id, project = %project.slug, created, "group saved");

        Ok(Saved {
            record: group,
            created,
            redirect: None,
            reset_form: true,
            close_dialog: true,
        })
    }

    fn group_failed(&self, project: &Project, err: StorageError) -> FormError {
        tracing::error!(project = %project.slug, error = %err, "saving group failed");
        self.notifier.notify(
            "an error occurred while saving the group",
            NotificationKind::Error,
        );
        FormError::Storage(err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use guardnotes_storage::{NewProject, Repository};

    use super::*;
    use crate::dashboard::testing::{Fixture, blocking_fixture, broken_fixture, fixture};
    use crate::error::ErrorKind;

    async fn project(fx: &Fixture, slug: &str) -> Project {
        fx.store
            .create_project(NewProject {
                name: slug.to_owned(),
                slug: slug.to_owned(),
                description: String::new(),
                image_url: None,
            })
            .await
            .unwrap()
    }

    fn input(name: &str) -> GroupInput {
        GroupInput {
            name: name.to_owned(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn create_notifies_and_closes_dialog() {
        let fx = fixture();
        let p = project(&fx, "atlas").await;

        let saved = fx
            .dashboard
            .save_group(Some(&p), None, &input("Core Databases"))
            .await
            .unwrap();

        assert_eq!(saved.record.tag, "core-databases");
        assert!(saved.created && saved.reset_form && saved.close_dialog);
        let notes = fx.feed.drain();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::Success);
    }

    #[tokio::test]
    async fn without_project_nothing_is_written() {
        let fx = fixture();
        let p = project(&fx, "atlas").await;

        let err = fx
            .dashboard
            .save_group(None, None, &input("Backend"))
            .await
            .unwrap_err();

        assert!(matches!(err, FormError::NoProject));
        assert!(fx.store.list_groups(p.id).await.unwrap().is_empty());
        let notes = fx.feed.drain();
        assert_eq!(notes[0].message, "could not create the group");
        assert_eq!(notes[0].kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn duplicate_name_is_a_field_error() {
        let fx = fixture();
        let p = project(&fx, "atlas").await;
        fx.dashboard
            .save_group(Some(&p), None, &input("Backend"))
            .await
            .unwrap();
        fx.feed.drain();

        let err = fx
            .dashboard
            .save_group(Some(&p), None, &input("Backend"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(
            err.field_errors().unwrap().get("name"),
            Some("group name already exists")
        );
        assert!(fx.feed.drain().is_empty(), "conflicts must not notify");
    }

    #[tokio::test]
    async fn same_name_in_other_project_succeeds() {
        let fx = fixture();
        let a = project(&fx, "a").await;
        let b = project(&fx, "b").await;

        fx.dashboard
            .save_group(Some(&a), None, &input("Backend"))
            .await
            .unwrap();
        fx.dashboard
            .save_group(Some(&b), None, &input("Backend"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn edit_updates_in_place_and_invalidates_scope() {
        let fx = fixture();
        let p = project(&fx, "atlas").await;
        let other = project(&fx, "other").await;
        let created = fx
            .dashboard
            .save_group(Some(&p), None, &input("Backend"))
            .await
            .unwrap()
            .record;

        fx.dashboard.list_groups(&p).await.unwrap();
        fx.dashboard.list_groups(&other).await.unwrap();

        let saved = fx
            .dashboard
            .save_group(Some(&p), Some(created.id), &input("Backend Services"))
            .await
            .unwrap();

        assert!(!saved.created);
        assert_eq!(saved.record.id, created.id);
        assert_eq!(saved.record.tag, "backend-services");
        assert!(!fx.dashboard.cache().contains(&QueryKey::groups("atlas")).await);
        assert!(fx.dashboard.cache().contains(&QueryKey::groups("other")).await);
        assert_eq!(fx.dashboard.list_groups(&p).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn edit_with_group_from_other_project_is_rejected() {
        let fx = fixture();
        let a = project(&fx, "a").await;
        let b = project(&fx, "b").await;
        let group = fx
            .dashboard
            .save_group(Some(&b), None, &input("Backend"))
            .await
            .unwrap()
            .record;
        fx.dashboard.list_groups(&b).await.unwrap();
        fx.feed.drain();

        let err = fx
            .dashboard
            .save_group(Some(&a), Some(group.id), &input("Hijacked"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FormError::Storage(StorageError::NotFound { entity: "group", .. })
        ));
        let stored = fx.store.find_group(group.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Backend");
        assert_eq!(stored.project_id, b.id);
        assert_eq!(fx.dashboard.list_groups(&b).await.unwrap()[0].name, "Backend");
        let notes = fx.feed.drain();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "an error occurred while saving the group");
    }

    #[tokio::test]
    async fn other_failures_notify_generically() {
        let fx = broken_fixture();
        let p = project(&fx, "atlas").await;

        let err = fx
            .dashboard
            .save_group(Some(&p), None, &input("Backend"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Unknown);
        let notes = fx.feed.drain();
        assert_eq!(notes[0].message, "an error occurred while saving the group");
    }

    #[tokio::test]
    async fn duplicate_save_is_in_flight_until_first_is_cancelled() {
        let (fx, gate) = blocking_fixture();
        let p = project(&fx, "atlas").await;

        let first = tokio::spawn({
            let dashboard = fx.dashboard.clone();
            let p = p.clone();
            async move { dashboard.save_group(Some(&p), None, &input("Databases")).await }
        });
        gate.entered.await.unwrap();

        let second = fx.dashboard.save_group(Some(&p), None, &input("Databases")).await;
        assert!(matches!(second, Err(FormError::InFlight)));
        assert!(fx.feed.drain().is_empty());

        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());
        drop(gate.release);

        let retry = fx
            .dashboard
            .save_group(Some(&p), None, &input("Databases"))
            .await
            .unwrap();
        assert!(retry.created);
        assert_eq!(fx.store.list_groups(p.id).await.unwrap().len(), 1);
        let notes = fx.feed.drain();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "group created successfully");
    }
}
