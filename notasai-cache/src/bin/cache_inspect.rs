//! Inspect and maintain a template cache stored in an LMDB directory.
//!
//! ```text
//! cache_inspect [--config <path>] [--db <dir>] [--user <id>] <stats|list|most-used [n]|sweep|clear>
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use notasai_cache::{LmdbStore, LmdbStoreError, TemplateCacheService, DEFAULT_MOST_USED_LIMIT};
use notasai_core::{CacheConfig, CacheError, ConfigError};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_DIR: &str = "notasai-cache-db";
const DEFAULT_MAP_SIZE_MB: usize = 64;

#[derive(Debug, Error)]
enum InspectError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] LmdbStoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[derive(Debug)]
enum Command {
    Stats,
    List,
    MostUsed(usize),
    Sweep,
    Clear,
}

#[derive(Debug)]
struct Args {
    config: Option<PathBuf>,
    db: PathBuf,
    user: Option<String>,
    command: Command,
}

fn parse_args() -> Result<Args, InspectError> {
    let mut config = None;
    let mut db = std::env::var("NOTASAI_CACHE_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_DIR));
    let mut user = None;
    let mut positional = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config = args.next().map(PathBuf::from),
            "--db" => {
                if let Some(dir) = args.next() {
                    db = PathBuf::from(dir);
                }
            }
            "--user" => user = args.next(),
            _ => positional.push(arg),
        }
    }

    let command = match positional.first().map(String::as_str) {
        Some("stats") => Command::Stats,
        Some("list") => Command::List,
        Some("most-used") => {
            let limit = match positional.get(1) {
                Some(n) => n
                    .parse()
                    .map_err(|_| InspectError::Usage(format!("invalid limit: {n}")))?,
                None => DEFAULT_MOST_USED_LIMIT,
            };
            Command::MostUsed(limit)
        }
        Some("sweep") => Command::Sweep,
        Some("clear") => Command::Clear,
        Some(other) => return Err(InspectError::Usage(format!("unknown command: {other}"))),
        None => {
            return Err(InspectError::Usage(
                "usage: cache_inspect [--config <path>] [--db <dir>] [--user <id>] \
                 <stats|list|most-used [n]|sweep|clear>"
                    .to_string(),
            ))
        }
    };

    Ok(Args {
        config,
        db,
        user,
        command,
    })
}

fn main() -> Result<(), InspectError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("notasai_cache=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => CacheConfig::from_path(path)?,
        None => CacheConfig::from_env(),
    };

    let store = Arc::new(LmdbStore::new(&args.db, DEFAULT_MAP_SIZE_MB)?);
    let mut cache: TemplateCacheService<LmdbStore> =
        TemplateCacheService::with_config(store, config)?;
    if let Some(user) = &args.user {
        cache.set_user(user);
    }

    match args.command {
        Command::Stats => println!("{}", cache.get_cache_stats()),
        Command::List => {
            let container = cache.inspect()?;
            for (id, entry) in &container.data {
                println!(
                    "{id}\t{}\t{} uses\twritten {}",
                    entry.data.name,
                    entry.access_count,
                    entry.timestamp.to_rfc3339()
                );
            }
            println!("{} entries under {}", container.len(), cache.storage_key());
        }
        Command::MostUsed(limit) => {
            for template in cache.stats().get_most_used(Some(limit)) {
                println!("{}\t{}", template.id, template.name);
            }
        }
        Command::Sweep => {
            // Opening the service already swept; report that pass too.
            if let Some(startup) = cache.cleanup_report() {
                println!("on open: {startup}");
            }
            println!("rescan:  {}", cache.sweep_stale_namespaces());
        }
        Command::Clear => {
            cache.clear();
            println!("cleared {}", cache.storage_key());
        }
    }

    Ok(())
}
