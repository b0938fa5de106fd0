//! Domain models.
//!
//! Users, projects, groups and credentials. All IDs are UUIDs. Password
//! hashes never serialize; credential values do, so response layers must
//! mask them before sending them to a client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Users ────────────────────────────────────────────────────────────

/// How a user authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum Provider {
    /// Username + password stored locally.
    Credentials,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Credentials => write!(f, "CREDENTIALS"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CREDENTIALS" => Ok(Self::Credentials),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// A dashboard user.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub provider: Provider,
    #[serde(skip)]
    pub password_hash: String,
    pub complete_name: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for a user that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub provider: Provider,
    pub password_hash: String,
    pub complete_name: String,
}

// ── Projects ─────────────────────────────────────────────────────────

/// A project. Owns zero or more groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated fields for a new project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub image_url: Option<String>,
}

// ── Groups ───────────────────────────────────────────────────────────

/// A group of credentials inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub tag: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated fields for creating or editing a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDraft {
    pub name: String,
    pub tag: String,
    pub description: String,
}

// ── Credentials ──────────────────────────────────────────────────────

/// Deployment stage a credential applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Environment {
    Local,
    Dev,
    Pre,
    Pro,
}

impl Environment {
    /// Every environment, in display order.
    pub const ALL: [Self; 4] = [Self::Local, Self::Dev, Self::Pre, Self::Pro];

    /// The wire/database representation (`LOCAL`, `DEV`, `PRE`, `PRO`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
            Self::Dev => "DEV",
            Self::Pre => "PRE",
            Self::Pro => "PRO",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|env| env.as_str() == s)
            .ok_or_else(|| format!("unknown environment: {s}"))
    }
}

/// A key/value credential pair scoped to an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kv {
    pub id: Uuid,
    pub group_id: Uuid,
    pub key: String,
    pub value: String,
    pub environment: Environment,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated fields for creating or updating a credential.
#[derive(Clone, PartialEq, Eq)]
pub struct KvDraft {
    pub key: String,
    pub value: String,
    pub environment: Environment,
}

impl std::fmt::Debug for KvDraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvDraft")
            .field("key", &self.key)
            .field("value", &"[redacted]")
            .field("environment", &self.environment)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_uppercase_only() {
        assert_eq!("PRE".parse::<Environment>().unwrap(), Environment::Pre);
        assert!("pre".parse::<Environment>().is_err());
        assert!("STAGING".parse::<Environment>().is_err());
    }

    #[test]
    fn environment_serializes_uppercase() {
        let json = serde_json::to_string(&Environment::Local).unwrap();
        assert_eq!(json, "\"LOCAL\"");
    }

    #[test]
    fn provider_roundtrips_through_display() {
        let p: Provider = Provider::Credentials.to_string().parse().unwrap();
        assert_eq!(p, Provider::Credentials);
    }

    #[test]
    fn kv_draft_debug_hides_value() {
        let draft = KvDraft {
            key: "admin".to_owned(),
            value: "hunter2".to_owned(),
            environment: Environment::Dev,
        };
        let out = format!("{draft:?}");
        assert!(!out.contains("hunter2"));
    }
}
