//! Startup bootstrap: schema migration and the default administrator.
//!
//! Runs once per process start (and from the `seed` command):
//!
//! 1. Outside `development`, apply pending migrations. A failure here is
//!    fatal and aborts the rest of the routine.
//! 2. If `DEFAULT_USERNAME` is set and no such user exists, create it with
//!    the Argon2id hash of `DEFAULT_PASSWORD` (skipped if that is unset).
//!
//! Running it again never creates a second account.

use serde::Serialize;

use guardnotes_storage::{Migrator, NewUser, Provider, Repository, StorageError};

use crate::error::BootstrapError;
use crate::password::PasswordHasher;

/// Deployment mode, from `NODE_ENV`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEnv {
    Development,
    Production,
    Test,
    Other(String),
}

impl RuntimeEnv {
    /// Parse a `NODE_ENV` value. Empty means `development`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "" | "development" => Self::Development,
            "production" => Self::Production,
            "test" => Self::Test,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Migrations are only skipped in development.
    #[must_use]
    pub fn applies_migrations(&self) -> bool {
        !matches!(self, Self::Development)
    }
}

impl std::fmt::Display for RuntimeEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Test => write!(f, "test"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Bootstrap settings.
#[derive(Clone)]
pub struct BootstrapConfig {
    pub runtime_env: RuntimeEnv,
    pub default_username: Option<String>,
    pub default_password: Option<String>,
}

impl std::fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("runtime_env", &self.runtime_env)
            .field("default_username", &self.default_username)
            .field(
                "default_password",
                &self.default_password.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

impl BootstrapConfig {
    /// Load from `NODE_ENV`, `DEFAULT_USERNAME` and `DEFAULT_PASSWORD`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());
        Self {
            runtime_env: RuntimeEnv::parse(&lookup("NODE_ENV").unwrap_or_default()),
            default_username: non_empty("DEFAULT_USERNAME"),
            default_password: non_empty("DEFAULT_PASSWORD"),
        }
    }
}

/// What happened to the default user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultUser {
    /// `DEFAULT_USERNAME` is not configured.
    NoUsername,
    /// The user already exists.
    AlreadyExists,
    /// `DEFAULT_PASSWORD` is not configured.
    NoPassword,
    /// The user was created.
    Created,
}

/// Summary of a bootstrap run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub migrated: bool,
    pub default_user: DefaultUser,
}

/// Run the bootstrap routine.
///
/// # Errors
///
/// - [`BootstrapError::Migration`] if migrations fail (the default user is
///   not touched)
/// - [`BootstrapError::Password`] if the default password cannot be hashed
/// - [`BootstrapError::Storage`] if the user lookup or insert fails
pub async fn run(
    config: &BootstrapConfig,
    migrator: &dyn Migrator,
    repo: &dyn Repository,
    hasher: &PasswordHasher,
) -> Result<BootstrapReport, BootstrapError> {
    let migrated = if config.runtime_env.applies_migrations() {
        migrator.migrate().await.map_err(|e| {
            tracing::error!(error = %e, "error applying migrations");
            BootstrapError::Migration(e)
        })?;
        tracing::info!(env = %config.runtime_env, "migrations applied");
        true
    } else {
        tracing::info!("skipping migrations in development environment");
        false
    };

    let default_user = ensure_default_user(config, repo, hasher).await?;
    Ok(BootstrapReport {
        migrated,
        default_user,
    })
}

async fn ensure_default_user(
    config: &BootstrapConfig,
    repo: &dyn Repository,
    hasher: &PasswordHasher,
) -> Result<DefaultUser, BootstrapError> {
    let Some(username) = config.default_username.as_deref() else {
        tracing::info!("no default username provided");
        return Ok(DefaultUser::NoUsername);
    };

    if repo
        .find_user_by_username(username)
        .await
        .map_err(BootstrapError::Storage)?
        .is_some()
    {
        tracing::info!(username, "default user already exists");
        return Ok(DefaultUser::AlreadyExists);
    }

    let Some(password) = config.default_password.as_deref() else {
        tracing::warn!(username, "no default password provided");
        return Ok(DefaultUser::NoPassword);
    };

    let user = NewUser {
        username: username.to_owned(),
        provider: Provider::Credentials,
        password_hash: hasher.hash(password)?,
        complete_name: username.to_owned(),
    };

    match repo.create_user(user).await {
        Ok(user) => {
            tracing::info!(username, user_id = %user.id, "default user created");
            Ok(DefaultUser::Created)
        }
        // Another process created it between the lookup and the insert.
        Err(StorageError::Conflict { .. }) => {
            tracing::info!(username, "default user already exists");
            Ok(DefaultUser::AlreadyExists)
        }
        Err(e) => Err(BootstrapError::Storage(e)),
    }
}
