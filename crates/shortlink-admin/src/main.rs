mod cli;

use crate::cli::{Command, CLI};
use clap::Parser;
use jiff::Timestamp;
use shortlink_core::{ClickStats, Link, ReadStorage, Storage, StorageError};
use std::collections::BTreeMap;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = CLI::try_parse()?;

    info!(storage_backend = %config.storage, "starting shortlink admin");

    let storage = shortlink_storage::open(config.storage_config()?)?;
    run(storage.as_ref(), config.command)
}

fn run(storage: &dyn Storage, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::List => {
            let mut links = storage.load_all()?;
            links.sort_by(|a, b| a.short.cmp(&b.short));
            println!("{}", serde_json::to_string_pretty(&links)?);
        }
        Command::Get { short } => {
            let link = storage.load(&short)?;
            println!("{}", serde_json::to_string_pretty(&link)?);
        }
        Command::Set { short, long, owner } => {
            let link = upsert(storage, short, long, owner, Timestamp::now())?;
            info!(short = %link.short, key = %link.key(), "saved link");
        }
        Command::Stats => {
            let stats: BTreeMap<_, _> = storage.load_stats()?.into_iter().collect();
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Click { short, count } => {
            storage.save_stats(&ClickStats::from([(short.clone(), count)]))?;
            info!(short = %short, count, "recorded clicks");
        }
    }
    Ok(())
}

/// Saves a link, keeping the creation time of the link it replaces.
fn upsert(
    storage: &dyn Storage,
    short: String,
    long: String,
    owner: String,
    now: Timestamp,
) -> Result<Link, StorageError> {
    let created = match storage.load(&short) {
        Ok(existing) => existing.created,
        Err(StorageError::NotFound(_)) => now,
        Err(e) => return Err(e),
    };

    let link = Link {
        short,
        long,
        created,
        last_edit: now,
        owner,
    };
    storage.save(&link)?;
    Ok(link)
}
