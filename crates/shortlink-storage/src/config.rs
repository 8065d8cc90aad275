use crate::remote::RemoteStorage;
use crate::sqlite::SqliteStorage;
use shortlink_core::{Result, Storage};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use typed_builder::TypedBuilder;

/// How long a SQLite connection waits on a locked database file.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on open connections to one SQLite database file.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;

/// Configuration for [`SqliteStorage`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct SqliteConfig {
    /// Database file. Created with the schema if missing.
    #[builder(setter(into))]
    pub path: PathBuf,
    /// Also bounds how long a caller waits for a free pooled connection.
    #[builder(default = DEFAULT_BUSY_TIMEOUT)]
    pub busy_timeout: Duration,
    #[builder(default = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,
}

/// Configuration for [`RemoteStorage`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct RemoteConfig {
    /// Deployment base URL, e.g. `https://example.convex.cloud`.
    #[builder(setter(into))]
    pub url: String,
    /// Bearer credential sent with every call.
    #[builder(setter(into))]
    pub token: String,
    /// Upper bound for one HTTP round trip. `None` waits indefinitely.
    #[builder(default, setter(strip_option))]
    pub timeout: Option<Duration>,
}

/// Selects one storage backend.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Sqlite(SqliteConfig),
    Remote(RemoteConfig),
}

impl StorageConfig {
    /// Short backend name for logs.
    pub fn backend_name(&self) -> &'static str {
        match self {
            StorageConfig::Sqlite(_) => "sqlite",
            StorageConfig::Remote(_) => "remote",
        }
    }
}

/// Opens the backend described by `config`.
pub fn open(config: StorageConfig) -> Result<Box<dyn Storage>> {
    info!(backend = config.backend_name(), "opening storage backend");

    let storage: Box<dyn Storage> = match config {
        StorageConfig::Sqlite(config) => Box::new(SqliteStorage::open(config)?),
        StorageConfig::Remote(config) => Box::new(RemoteStorage::new(config)?),
    };
    Ok(storage)
}
