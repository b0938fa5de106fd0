//! Server configuration for Guard Notes.
//!
//! Loads configuration from environment variables with sensible defaults.
//! A `.env` file in the working directory is read first by the binary, so
//! every setting below can also live there.

use std::net::SocketAddr;

use guardnotes_core::bootstrap::BootstrapConfig;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_NOTIFICATION_CAPACITY: usize = 128;
const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 256;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Storage backend type.
    pub storage_backend: StorageBackendType,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// How many undelivered notifications to keep before dropping the oldest.
    pub notification_capacity: usize,
    /// Upper bound on requests handled at once.
    pub max_concurrent_requests: usize,
    /// Migration and default-user settings.
    pub bootstrap: BootstrapConfig,
}

/// Supported storage backend types.
#[derive(Clone, PartialEq, Eq)]
pub enum StorageBackendType {
    /// In-memory (development only, data lost on restart).
    Memory,
    /// PostgreSQL persistent storage.
    Postgres { url: String },
}

impl std::fmt::Debug for StorageBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "Memory"),
            // The URL usually carries credentials.
            Self::Postgres { .. } => write!(f, "Postgres {{ url: [redacted] }}"),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on (binds to `0.0.0.0`)
    /// - `GUARDNOTES_BIND_ADDR`: full bind address (overrides `PORT`, default: `127.0.0.1:3000`)
    /// - `GUARDNOTES_STORAGE`: `memory` or `postgres` (default: `postgres` when
    ///   `DATABASE_URL` is set, `memory` otherwise)
    /// - `DATABASE_URL`: PostgreSQL connection string
    /// - `GUARDNOTES_LOG_LEVEL`: log filter (default: `info`)
    /// - `GUARDNOTES_NOTIFICATION_CAPACITY`: notification feed size (default: `128`)
    /// - `GUARDNOTES_MAX_CONCURRENT_REQUESTS`: request concurrency cap (default: `256`)
    /// - `NODE_ENV`, `DEFAULT_USERNAME`, `DEFAULT_PASSWORD`: see [`BootstrapConfig`]
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Priority: GUARDNOTES_BIND_ADDR > PORT > default 127.0.0.1:3000
        let bind_addr = if let Some(addr) = lookup("GUARDNOTES_BIND_ADDR") {
            addr.parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))
        } else if let Some(port_str) = lookup("PORT") {
            let port: u16 = port_str.parse().unwrap_or(DEFAULT_PORT);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))
        };

        let database_url = lookup("DATABASE_URL").filter(|v| !v.is_empty());
        let storage_backend = match lookup("GUARDNOTES_STORAGE")
            .map(|v| v.to_lowercase())
            .as_deref()
        {
            Some("memory") => StorageBackendType::Memory,
            Some("postgres" | "postgresql") => StorageBackendType::Postgres {
                url: database_url
                    .unwrap_or_else(|| "postgres://localhost/guardnotes".to_owned()),
            },
            _ => match database_url {
                Some(url) => StorageBackendType::Postgres { url },
                None => StorageBackendType::Memory,
            },
        };

        let log_level = lookup("GUARDNOTES_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let notification_capacity = lookup("GUARDNOTES_NOTIFICATION_CAPACITY")
            .and_then(|v| v.parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_NOTIFICATION_CAPACITY);

        let max_concurrent_requests = lookup("GUARDNOTES_MAX_CONCURRENT_REQUESTS")
            .and_then(|v| v.parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_MAX_CONCURRENT_REQUESTS);

        Self {
            bind_addr,
            storage_backend,
            log_level,
            notification_capacity,
            max_concurrent_requests,
            bootstrap: BootstrapConfig::from_lookup(&lookup),
        }
    }
}
