//! Storage backends for shortlink.
//!
//! Two interchangeable implementations of [`Storage`]: [`SqliteStorage`]
//! keeps links and a click ledger in a local SQLite file, and
//! [`RemoteStorage`] calls a hosted query/mutation function service over
//! HTTP. Pick one with [`open`].

pub mod config;
mod document;
pub mod remote;
pub mod sqlite;
mod stats;

pub use config::{open, RemoteConfig, SqliteConfig, StorageConfig};
pub use remote::RemoteStorage;
pub use shortlink_core::{ClickStats, Link, ReadStorage, Result, Storage, StorageError};
pub use sqlite::SqliteStorage;
