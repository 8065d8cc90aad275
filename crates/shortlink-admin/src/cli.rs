use clap::{Parser, Subcommand, ValueEnum};
use shortlink_storage::{RemoteConfig, SqliteConfig, StorageConfig};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const STORAGE_BACKEND_ENV: &str = "SHORTLINK_STORAGE_BACKEND";
pub const SQLITE_PATH_ENV: &str = "SHORTLINK_SQLITE_PATH";
pub const REMOTE_URL_ENV: &str = "SHORTLINK_REMOTE_URL";
pub const REMOTE_TOKEN_ENV: &str = "SHORTLINK_REMOTE_TOKEN";
pub const TIMEOUT_SECS_ENV: &str = "SHORTLINK_TIMEOUT_SECS";

pub const DEFAULT_SQLITE_PATH: &str = "shortlink.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "sqlite")]
    Sqlite,
    #[value(name = "remote")]
    Remote,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::Sqlite => write!(f, "sqlite"),
            StorageBackendArg::Remote => write!(f, "remote"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "shortlink-admin", about = "Inspect and edit shortlink storage")]
pub struct CLI {
    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::Sqlite
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = SQLITE_PATH_ENV, default_value = DEFAULT_SQLITE_PATH)]
    pub sqlite_path: PathBuf,

    #[arg(long, env = REMOTE_URL_ENV, required_if_eq("storage", "remote"))]
    pub remote_url: Option<String>,

    #[arg(
        long,
        env = REMOTE_TOKEN_ENV,
        hide_env_values = true,
        required_if_eq("storage", "remote")
    )]
    pub remote_token: Option<String>,

    /// Upper bound in seconds for a single storage call.
    #[arg(long, env = TIMEOUT_SECS_ENV)]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print every link as JSON.
    List,
    /// Print one link as JSON.
    Get { short: String },
    /// Create a link or point an existing one somewhere else.
    Set {
        short: String,
        long: String,
        #[arg(long, default_value = "")]
        owner: String,
    },
    /// Print click totals as JSON.
    Stats,
    /// Record clicks for a link.
    Click {
        short: String,
        #[arg(default_value_t = 1)]
        count: u64,
    },
}

impl CLI {
    /// Builds the storage configuration selected on the command line.
    pub fn storage_config(&self) -> Result<StorageConfig, String> {
        let timeout = self.timeout_secs.map(Duration::from_secs);

        match self.storage {
            StorageBackendArg::Sqlite => {
                let mut config = SqliteConfig::builder()
                    .path(self.sqlite_path.clone())
                    .build();
                if let Some(timeout) = timeout {
                    config.busy_timeout = timeout;
                }
                Ok(StorageConfig::Sqlite(config))
            }
            StorageBackendArg::Remote => {
                let url = self
                    .remote_url
                    .clone()
                    .ok_or("remote url is required when storage backend is remote")?;
                let token = self
                    .remote_token
                    .clone()
                    .ok_or("remote token is required when storage backend is remote")?;
                let mut config = RemoteConfig::builder().url(url).token(token).build();
                config.timeout = timeout;
                Ok(StorageConfig::Remote(config))
            }
        }
    }
}
