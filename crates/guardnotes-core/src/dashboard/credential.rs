//! Credential form.

use uuid::Uuid;

use guardnotes_storage::Kv;

use super::{Dashboard, Saved};
use crate::cache::QueryKey;
use crate::error::FormError;
use crate::notify::NotificationKind;
use crate::validation::{CredentialInput, validate_credential};

impl Dashboard {
    /// Create a credential in `group_id`, or update credential `id` in place.
    ///
    /// On success the group's credential list is invalidated and a
    /// "created"/"updated" notification is raised. Every persistence failure
    /// raises the same generic error notification.
    ///
    /// # Errors
    ///
    /// - [`FormError::Validation`] for invalid input
    /// - [`FormError::InFlight`] for a duplicate concurrent submission
    /// - [`FormError::Storage`] for anything else, including an unknown `id`
    pub async fn save_credential(
        &self,
        group_id: Uuid,
        id: Option<Uuid>,
        input: &CredentialInput,
    ) -> Result<Saved<Kv>, FormError> {
        let draft = validate_credential(input).map_err(FormError::Validation)?;
        let target = id.map_or_else(
            || format!("new:{}:{}", draft.environment, draft.key),
            |id| id.to_string(),
        );
        let _submission = self.claim(format!("credential:{group_id}:{target}"))?;

        let kv = match self
            .repo
            .create_or_update_credential(id, group_id, draft)
            .await
        {
            Ok(kv) => kv,
            Err(e) => {
                tracing::error!(group_id = %group_id, error = %e, "saving credentials failed");
                self.notifier.notify(
                    "an error occurred while saving the credentials",
                    NotificationKind::Error,
                );
                return Err(FormError::Storage(e));
            }
        };

        self.cache.invalidate(&QueryKey::credentials(group_id)).await;

        let created = id.is_none();
        self.notifier.notify(
            if created {
                "credentials created"
            } else {
                "credentials updated"
            },
            NotificationKind::Success,
        );
        tracing::info!(
            credential_id = %kv.id,
            group_id = %group_id,
            environment = %kv.environment,
            created,
            "credentials saved"
        );

        Ok(Saved {
            record: kv,
            created,
            redirect: None,
            reset_form: true,
            close_dialog: true,
        })
    }
}
