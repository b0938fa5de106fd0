//! PostgreSQL repository.
//!
//! One table per entity. Uniqueness and foreign-key violations are mapped
//! from their SQLSTATE and constraint name to [`StorageError::Conflict`] and
//! [`StorageError::NotFound`], so no caller ever matches on message text.
//!
//! Feature-gated behind `postgres-backend`. Uses `sqlx` with the Tokio
//! runtime for fully async operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::model::{
    Environment, Group, GroupDraft, Kv, KvDraft, NewProject, NewUser, Project, Provider, User,
};
use crate::{Migrator, Repository, StorageError};

/// Schema statements, applied in order by [`Migrator::migrate`].
const SCHEMA: &[&str] = &[
    r"CREATE TABLE IF NOT EXISTS users (
        id            UUID        PRIMARY KEY,
        username      TEXT        NOT NULL,
        provider      TEXT        NOT NULL,
        password      TEXT        NOT NULL,
        complete_name TEXT        NOT NULL,
        created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT users_username_key UNIQUE (username)
    )",
    r"CREATE TABLE IF NOT EXISTS projects (
        id          UUID        PRIMARY KEY,
        name        TEXT        NOT NULL,
        slug        TEXT        NOT NULL,
        description TEXT        NOT NULL DEFAULT '',
        image_url   TEXT,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT projects_slug_key UNIQUE (slug)
    )",
    r"CREATE TABLE IF NOT EXISTS project_groups (
        id          UUID        PRIMARY KEY,
        project_id  UUID        NOT NULL,
        name        TEXT        NOT NULL,
        tag         TEXT        NOT NULL,
        description TEXT        NOT NULL DEFAULT '',
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT project_groups_project_id_fkey
            FOREIGN KEY (project_id) REFERENCES projects (id) ON DELETE CASCADE,
        CONSTRAINT project_groups_project_id_name_key UNIQUE (project_id, name)
    )",
    r"CREATE TABLE IF NOT EXISTS credentials (
        id          UUID        PRIMARY KEY,
        group_id    UUID        NOT NULL,
        key         TEXT        NOT NULL,
        value       TEXT        NOT NULL,
        environment TEXT        NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT credentials_group_id_fkey
            FOREIGN KEY (group_id) REFERENCES project_groups (id) ON DELETE CASCADE,
        CONSTRAINT credentials_environment_check
            CHECK (environment IN ('LOCAL', 'DEV', 'PRE', 'PRO'))
    )",
    "CREATE INDEX IF NOT EXISTS idx_credentials_group_id ON credentials (group_id)",
];

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE for `foreign_key_violation`.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// A [`Repository`] backed by PostgreSQL.
///
/// Thread-safe via `PgPool` (connection pool).
///
/// # Examples
///
/// ```no_run
/// # use guardnotes_storage::PostgresStore;
/// # #[tokio::main]
/// # async fn main() {
/// let store = PostgresStore::connect("postgres://localhost/guardnotes").await.unwrap();
/// # }
/// ```
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl std::fmt::Debug for PostgresStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStore")
            .field("pool", &"[PgPool]")
            .finish_non_exhaustive()
    }
}

impl PostgresStore {
    /// Connect to PostgreSQL. Does not touch the schema; see [`Migrator`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connect`] if the pool cannot be established.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Connect {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translate a sqlx error into a typed storage error.
fn map_err(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        let code = db_err.code();
        match (code.as_deref(), db_err.constraint()) {
            (Some(UNIQUE_VIOLATION), Some("users_username_key")) => {
                return StorageError::Conflict {
                    entity: "user",
                    field: "username",
                };
            }
            (Some(UNIQUE_VIOLATION), Some("projects_slug_key")) => {
                return StorageError::Conflict {
                    entity: "project",
                    field: "slug",
                };
            }
            (Some(UNIQUE_VIOLATION), Some("project_groups_project_id_name_key")) => {
                return StorageError::Conflict {
                    entity: "group",
                    field: "name",
                };
            }
            (Some(FOREIGN_KEY_VIOLATION), Some("project_groups_project_id_fkey")) => {
                return StorageError::NotFound {
                    entity: "project",
                    id: String::new(),
                };
            }
            (Some(FOREIGN_KEY_VIOLATION), Some("credentials_group_id_fkey")) => {
                return StorageError::NotFound {
                    entity: "group",
                    id: String::new(),
                };
            }
            _ => {}
        }
    }

    StorageError::Query {
        reason: err.to_string(),
    }
}

// ── Rows ─────────────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    provider: String,
    password: String,
    complete_name: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StorageError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let provider: Provider = row.provider.parse().map_err(|reason| StorageError::Corrupt {
            table: "users",
            reason,
        })?;
        Ok(Self {
            id: row.id,
            username: row.username,
            provider,
            password_hash: row.password,
            complete_name: row.complete_name,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct KvRow {
    id: Uuid,
    group_id: Uuid,
    key: String,
    value: String,
    environment: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<KvRow> for Kv {
    type Error = StorageError;

    fn try_from(row: KvRow) -> Result<Self, Self::Error> {
        let environment: Environment =
            row.environment
                .parse()
                .map_err(|reason| StorageError::Corrupt {
                    table: "credentials",
                    reason,
                })?;
        Ok(Self {
            id: row.id,
            group_id: row.group_id,
            key: row.key,
            value: row.value,
            environment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    name: String,
    slug: String,
    description: String,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: Uuid,
    project_id: Uuid,
    name: String,
    tag: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            name: row.name,
            tag: row.tag,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ── Repository ───────────────────────────────────────────────────────

#[async_trait::async_trait]
impl Repository for PostgresStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?
            .map(User::try_from)
            .transpose()
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        sqlx::query_as::<_, UserRow>(
            r"INSERT INTO users (id, username, provider, password, complete_name)
              VALUES ($1, $2, $3, $4, $5)
              RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(user.provider.to_string())
        .bind(&user.password_hash)
        .bind(&user.complete_name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?
        .try_into()
    }

    async fn create_project(&self, project: NewProject) -> Result<Project, StorageError> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r"INSERT INTO projects (id, name, slug, description, image_url)
              VALUES ($1, $2, $3, $4, $5)
              RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&project.name)
        .bind(&project.slug)
        .bind(&project.description)
        .bind(&project.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;

        Ok(row.into())
    }

    async fn list_projects(&self) -> Result<Vec<Project>, StorageError> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            "SELECT * FROM projects ORDER BY created_at DESC, slug",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        Ok(rows.into_iter().map(Project::from).collect())
    }

    async fn find_project_by_slug(&self, slug: &str) -> Result<Option<Project>, StorageError> {
        let row = sqlx::query_as::<_, ProjectRow>("SELECT * FROM projects WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;

        Ok(row.map(Project::from))
    }

    async fn create_group(
        &self,
        project_id: Uuid,
        group: GroupDraft,
    ) -> Result<Group, StorageError> {
        let row = sqlx::query_as::<_, GroupRow>(
            r"INSERT INTO project_groups (id, project_id, name, tag, description)
              VALUES ($1, $2, $3, $4, $5)
              RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(&group.name)
        .bind(&group.tag)
        .bind(&group.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_err(e) {
            StorageError::NotFound { entity, .. } => StorageError::NotFound {
                entity,
                id: project_id.to_string(),
            },
            other => other,
        })?;

        Ok(row.into())
    }

    async fn update_group(
        &self,
        project_id: Uuid,
        id: Uuid,
        group: GroupDraft,
    ) -> Result<Group, StorageError> {
        let row = sqlx::query_as::<_, GroupRow>(
            r"UPDATE project_groups
              SET name = $3, tag = $4, description = $5, updated_at = now()
              WHERE id = $1 AND project_id = $2
              RETURNING *",
        )
        .bind(id)
        .bind(project_id)
        .bind(&group.name)
        .bind(&group.tag)
        .bind(&group.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?
        .ok_or_else(|| StorageError::NotFound {
            entity: "group",
            id: id.to_string(),
        })?;

        Ok(row.into())
    }

    async fn find_group(&self, id: Uuid) -> Result<Option<Group>, StorageError> {
        let row = sqlx::query_as::<_, GroupRow>("SELECT * FROM project_groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;

        Ok(row.map(Group::from))
    }

    async fn list_groups(&self, project_id: Uuid) -> Result<Vec<Group>, StorageError> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT * FROM project_groups WHERE project_id = $1 ORDER BY name",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        Ok(rows.into_iter().map(Group::from).collect())
    }

    async fn create_or_update_credential(
        &self,
        id: Option<Uuid>,
        group_id: Uuid,
        kv: KvDraft,
    ) -> Result<Kv, StorageError> {
        let row = if let Some(id) = id {
            sqlx::query_as::<_, KvRow>(
                r"UPDATE credentials
                  SET key = $3, value = $4, environment = $5, updated_at = now()
                  WHERE id = $1 AND group_id = $2
                  RETURNING *",
            )
            .bind(id)
            .bind(group_id)
            .bind(&kv.key)
            .bind(&kv.value)
            .bind(kv.environment.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?
            .ok_or_else(|| StorageError::NotFound {
                entity: "credential",
                id: id.to_string(),
            })?
        } else {
            sqlx::query_as::<_, KvRow>(
                r"INSERT INTO credentials (id, group_id, key, value, environment)
                  VALUES ($1, $2, $3, $4, $5)
                  RETURNING *",
            )
            .bind(Uuid::new_v4())
            .bind(group_id)
            .bind(&kv.key)
            .bind(&kv.value)
            .bind(kv.environment.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match map_err(e) {
                StorageError::NotFound { entity, .. } => StorageError::NotFound {
                    entity,
                    id: group_id.to_string(),
                },
                other => other,
            })?
        };

        row.try_into()
    }

    async fn find_credential(&self, id: Uuid) -> Result<Option<Kv>, StorageError> {
        sqlx::query_as::<_, KvRow>("SELECT * FROM credentials WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?
            .map(Kv::try_from)
            .transpose()
    }

    async fn list_credentials(&self, group_id: Uuid) -> Result<Vec<Kv>, StorageError> {
        let rows = sqlx::query_as::<_, KvRow>(
            r"SELECT * FROM credentials
              WHERE group_id = $1
              ORDER BY array_position(ARRAY['LOCAL', 'DEV', 'PRE', 'PRO'], environment),
                       key, created_at",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        rows.into_iter().map(Kv::try_from).collect()
    }
}

#[async_trait::async_trait]
impl Migrator for PostgresStore {
    async fn migrate(&self) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Migration {
                reason: e.to_string(),
            })?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::Migration {
                    reason: e.to_string(),
                })?;
        }

        tx.commit().await.map_err(|e| StorageError::Migration {
            reason: e.to_string(),
        })?;

        tracing::info!(statements = SCHEMA.len(), "schema migrations applied");
        Ok(())
    }
}
