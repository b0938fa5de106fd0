//! Form validation.
//!
//! Each validator is a pure function from raw form input to either the
//! typed draft the repository accepts or a [`FieldErrors`] map keyed by form
//! field. Derived identifiers (slug, tag) are computed here so they can never
//! drift from the name they come from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use guardnotes_storage::{Environment, GroupDraft, KvDraft, NewProject};

use crate::slug::{slugify, tagify};

/// Maximum length of a project or group name.
pub const MAX_NAME_LEN: usize = 64;
/// Maximum length of a description.
pub const MAX_DESCRIPTION_LEN: usize = 500;
/// Maximum length of a credential key.
pub const MAX_KEY_LEN: usize = 255;
/// Maximum length of a credential value.
pub const MAX_VALUE_LEN: usize = 4096;

/// Field-level validation messages, keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A map holding a single message.
    #[must_use]
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    /// Record a message for `field`. The first message per field wins.
    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over `(field, message)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    fn finish<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

fn check_required(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &str,
    max: usize,
    label: &str,
) {
    if value.is_empty() {
        errors.insert(field, format!("{label} is required"));
    } else if value.chars().count() > max {
        errors.insert(field, format!("{label} must be at most {max} characters"));
    }
}

fn check_optional(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &str,
    max: usize,
    label: &str,
) {
    if value.chars().count() > max {
        errors.insert(field, format!("{label} must be at most {max} characters"));
    }
}

// ── Projects ─────────────────────────────────────────────────────────

/// Raw project form input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "imageUrl")]
    pub image_url: String,
}

/// Validate a project form and derive its slug.
///
/// # Errors
///
/// Returns the field messages when any field is invalid.
pub fn validate_project(input: &ProjectInput) -> Result<NewProject, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = input.name.trim();
    check_required(&mut errors, "name", name, MAX_NAME_LEN, "name");

    let slug = slugify(name);
    if !name.is_empty() && slug.is_empty() {
        errors.insert("name", "name must contain at least one letter or digit");
    }

    let description = input.description.trim();
    check_optional(
        &mut errors,
        "description",
        description,
        MAX_DESCRIPTION_LEN,
        "description",
    );

    let image_url = input.image_url.trim();
    let image_url = if image_url.is_empty() {
        None
    } else {
        match url::Url::parse(image_url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
                Some(image_url.to_owned())
            }
            _ => {
                errors.insert("image_url", "image URL must be an http(s) URL");
                None
            }
        }
    };

    errors.finish(NewProject {
        name: name.to_owned(),
        slug,
        description: description.to_owned(),
        image_url,
    })
}

// ── Groups ───────────────────────────────────────────────────────────

/// Raw group form input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Validate a group form and derive its tag.
///
/// # Errors
///
/// Returns the field messages when any field is invalid.
pub fn validate_group(input: &GroupInput) -> Result<GroupDraft, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = input.name.trim();
    check_required(&mut errors, "name", name, MAX_NAME_LEN, "name");

    let tag = tagify(name);
    if !name.is_empty() && tag.is_empty() {
        errors.insert("name", "name must contain at least one letter or digit");
    }

    let description = input.description.trim();
    check_optional(
        &mut errors,
        "description",
        description,
        MAX_DESCRIPTION_LEN,
        "description",
    );

    errors.finish(GroupDraft {
        name: name.to_owned(),
        tag,
        description: description.to_owned(),
    })
}

// ── Credentials ──────────────────────────────────────────────────────

/// Raw credential form input. `environment` is the select's raw value.
#[derive(Clone, Default, Deserialize)]
pub struct CredentialInput {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub environment: String,
}

impl std::fmt::Debug for CredentialInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialInput")
            .field("key", &self.key)
            .field("value", &"[redacted]")
            .field("environment", &self.environment)
            .finish()
    }
}

/// Validate a credential form.
///
/// The key is trimmed; the value is kept byte-for-byte since leading or
/// trailing whitespace may be part of the secret.
///
/// # Errors
///
/// Returns the field messages when any field is invalid.
pub fn validate_credential(input: &CredentialInput) -> Result<KvDraft, FieldErrors> {
    let mut errors = FieldErrors::new();

    let key = input.key.trim();
    check_required(&mut errors, "key", key, MAX_KEY_LEN, "key");
    check_required(&mut errors, "value", &input.value, MAX_VALUE_LEN, "value");

    let environment = match input.environment.parse::<Environment>() {
        Ok(env) => Some(env),
        Err(_) if input.environment.is_empty() => {
            errors.insert("environment", "select an environment");
            None
        }
        Err(_) => {
            errors.insert("environment", "environment must be one of LOCAL, DEV, PRE, PRO");
            None
        }
    };

    match environment {
        Some(environment) => errors.finish(KvDraft {
            key: key.to_owned(),
            value: input.value.clone(),
            environment,
        }),
        None => Err(errors),
    }
}
