use crate::config::SqliteConfig;
use crate::stats::{attribute_totals, deltas_by_key};
use jiff::Timestamp;
use parking_lot::RwLock;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};
use shortlink_core::link::{from_epoch_seconds, to_epoch_seconds};
use shortlink_core::{
    normalize, ClickStats, Link, ReadStorage, Result, Storage, StorageError,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, trace, warn};

const SCHEMA: &str = include_str!("../ddl/sqlite/schema.sql");

type SqlitePool = Pool<SqliteConnectionManager>;
type SqliteConnection = PooledConnection<SqliteConnectionManager>;

/// SQLite implementation of the storage contract.
///
/// Every operation runs under a reader/writer lock owned by the instance.
/// Loads share it; `save` and `save_stats` hold it exclusively, so a write
/// and its transaction are atomic with respect to every other call on the
/// same instance. Click deltas are appended to a ledger and summed on read.
///
/// Connections come from a bounded pool, so shared readers each use their
/// own connection. Nothing coordinates separate processes opening the same
/// file.
pub struct SqliteStorage {
    path: PathBuf,
    pool: SqlitePool,
    lock: RwLock<()>,
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("path", &self.path)
            .field("max_connections", &self.pool.max_size())
            .finish_non_exhaustive()
    }
}

/// A `Links` row before its timestamps are validated.
struct LinkRow {
    short: String,
    long: String,
    created: i64,
    last_edit: i64,
    owner: String,
}

impl LinkRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            short: row.get("Short")?,
            long: row.get("Long")?,
            created: row.get("Created")?,
            last_edit: row.get("LastEdit")?,
            owner: row.get("Owner")?,
        })
    }

    fn into_link(self) -> Result<Link> {
        Ok(Link {
            created: parse_epoch(&self.short, self.created)?,
            last_edit: parse_epoch(&self.short, self.last_edit)?,
            short: self.short,
            long: self.long,
            owner: self.owner,
        })
    }
}

fn parse_epoch(short: &str, seconds: i64) -> Result<Timestamp> {
    from_epoch_seconds(seconds).ok_or_else(|| {
        StorageError::Validation(format!("invalid timestamp {seconds} for link '{short}'"))
    })
}

fn map_rusqlite_error(err: rusqlite::Error) -> StorageError {
    let message = err.to_string();

    match err {
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::IntegralValueOutOfRange(..)
        | rusqlite::Error::InvalidColumnIndex(_)
        | rusqlite::Error::InvalidColumnName(_)
        | rusqlite::Error::InvalidColumnType(..) => StorageError::Validation(message),
        _ => StorageError::Io(message),
    }
}

fn map_pool_error(err: r2d2::Error) -> StorageError {
    StorageError::Io(format!("no sqlite connection available: {err}"))
}

fn query_links(conn: &Connection) -> rusqlite::Result<Vec<LinkRow>> {
    let mut stmt =
        conn.prepare_cached("SELECT Short, Long, Created, LastEdit, Owner FROM Links")?;
    let rows = stmt.query_map([], LinkRow::from_row)?;
    rows.collect()
}

fn into_links(rows: Vec<LinkRow>) -> Result<Vec<Link>> {
    rows.into_iter().map(LinkRow::into_link).collect()
}

fn insert_deltas(
    conn: &mut Connection,
    deltas: &BTreeMap<String, i64>,
    now: i64,
) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    {
        let mut stmt =
            tx.prepare_cached("INSERT INTO Stats (ID, Created, Clicks) VALUES (?1, ?2, ?3)")?;
        for (key, clicks) in deltas {
            stmt.execute(params![key, now, clicks])?;
        }
    }
    // Dropping an uncommitted transaction rolls it back.
    tx.commit()
}

impl SqliteStorage {
    /// Opens the database at `config.path`, creating the file and schema
    /// if needed.
    pub fn open(config: SqliteConfig) -> Result<Self> {
        let busy_timeout = config.busy_timeout;
        let manager = SqliteConnectionManager::file(&config.path)
            .with_init(move |conn| conn.busy_timeout(busy_timeout));

        // r2d2 rejects a zero pool size or checkout timeout.
        let pool = Pool::builder()
            .max_size(config.max_connections.max(1))
            .min_idle(Some(0))
            .connection_timeout(busy_timeout.max(Duration::from_millis(1)))
            .build(manager)
            .map_err(map_pool_error)?;

        let conn = pool.get().map_err(map_pool_error)?;
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(map_rusqlite_error)?;
        conn.execute_batch(SCHEMA).map_err(map_rusqlite_error)?;
        drop(conn);

        debug!(
            path = %config.path.display(),
            journal_mode = %mode,
            max_connections = pool.max_size(),
            "opened sqlite storage"
        );

        Ok(Self {
            path: config.path,
            pool,
            lock: RwLock::new(()),
        })
    }

    /// Opens the database at `path` with default settings.
    pub fn open_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(SqliteConfig::builder().path(path).build())
    }

    /// Returns the path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connection(&self) -> Result<SqliteConnection> {
        self.pool.get().map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "sqlite connection checkout failed");
            map_pool_error(e)
        })
    }
}

impl ReadStorage for SqliteStorage {
    fn load_all(&self) -> Result<Vec<Link>> {
        let rows = {
            let _guard = self.lock.read();
            let conn = self.connection()?;
            query_links(&conn).map_err(map_rusqlite_error)?
        };

        trace!(count = rows.len(), "loaded links from sqlite");
        into_links(rows)
    }

    fn load(&self, short: &str) -> Result<Link> {
        let key = normalize(short);

        let row = {
            let _guard = self.lock.read();
            let conn = self.connection()?;
            conn.query_row(
                "SELECT Short, Long, Created, LastEdit, Owner FROM Links WHERE ID = ?1 LIMIT 1",
                [&key],
                LinkRow::from_row,
            )
            .optional()
            .map_err(map_rusqlite_error)?
        };

        match row {
            Some(row) => row.into_link(),
            None => {
                trace!(key = %key, "link not found in sqlite");
                Err(StorageError::NotFound(key))
            }
        }
    }

    fn load_stats(&self) -> Result<ClickStats> {
        let (rows, totals) = {
            let _guard = self.lock.read();
            let conn = self.connection()?;
            let rows = query_links(&conn).map_err(map_rusqlite_error)?;
            let mut stmt = conn
                .prepare_cached("SELECT ID, SUM(Clicks) FROM Stats GROUP BY ID")
                .map_err(map_rusqlite_error)?;
            let totals = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
                .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
                .map_err(map_rusqlite_error)?;
            (rows, totals)
        };

        let links = into_links(rows)?;
        let totals = totals
            .into_iter()
            .map(|(key, clicks)| {
                u64::try_from(clicks)
                    .map(|clicks| (key.clone(), clicks))
                    .map_err(|_| {
                        StorageError::Validation(format!("negative click total {clicks} for '{key}'"))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(attribute_totals(&links, totals))
    }
}

impl Storage for SqliteStorage {
    fn save(&self, link: &Link) -> Result<()> {
        let key = link.key();

        let affected = {
            let _guard = self.lock.write();
            let conn = self.connection()?;
            conn.execute(
                "INSERT OR REPLACE INTO Links (ID, Short, Long, Created, LastEdit, Owner) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    key,
                    link.short,
                    link.long,
                    to_epoch_seconds(link.created),
                    to_epoch_seconds(link.last_edit),
                    link.owner,
                ],
            )
            .map_err(|e| {
                warn!(key = %key, error = %e, "failed to save link");
                map_rusqlite_error(e)
            })?
        };

        if affected != 1 {
            warn!(key = %key, affected, "upsert touched an unexpected number of rows");
            return Err(StorageError::Validation(format!(
                "expected to affect 1 row, affected {affected}"
            )));
        }

        debug!(key = %key, "saved link");
        Ok(())
    }

    fn save_stats(&self, deltas: &ClickStats) -> Result<()> {
        let deltas = deltas_by_key(deltas)?;

        let _guard = self.lock.write();
        let now = Timestamp::now().as_second();

        let mut conn = self.connection()?;
        insert_deltas(&mut conn, &deltas, now).map_err(|e| {
            warn!(error = %e, "failed to record click deltas, transaction rolled back");
            map_rusqlite_error(e)
        })?;

        debug!(links = deltas.len(), "recorded click deltas");
        Ok(())
    }
}
