//! fairkeep CLI - inspect and validate ownership snapshots.
//!
//! ```text
//! fairkeep [--db PATH] inspect [--container ID] [--player UUID]
//! fairkeep [--db PATH] check
//! ```
//!
//! The database path comes from `--db`, then `storage.path` in the config
//! file, then `~/.fairkeep/fairkeep.db`. Reports go to stdout as JSON, logs
//! go to stderr.

mod report;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use fairkeep_config::{FairkeepConfig, default_storage_path};
use fairkeep_store::SnapshotStore;
use fairkeep_types::{ContainerId, PlayerId};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Parser)]
#[command(name = "fairkeep", version, about = "Inspect and validate fairkeep ownership snapshots")]
struct Cli {
    /// Snapshot database to read.
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print stored ownership records.
    Inspect {
        /// Only records for this container, e.g. `PLAYER|PLAYER|<uuid>` or `VIRTUAL`.
        #[arg(long, value_name = "ID")]
        container: Option<ContainerId>,
        /// Summarize each record from this player's point of view.
        #[arg(long, value_name = "UUID")]
        player: Option<PlayerId>,
    },
    /// Decode every stored record and report totals.
    Check,
}

fn init_tracing(config: Option<&FairkeepConfig>) {
    let configured = config.and_then(|config| config.log_filter.as_deref());
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured.unwrap_or("warn")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

fn resolve_db(cli_db: Option<PathBuf>, config: Option<&FairkeepConfig>) -> Result<PathBuf> {
    let path = cli_db
        .or_else(|| config.and_then(|config| config.storage_path.clone()))
        .or_else(default_storage_path)
        .context("No snapshot database given and no home directory to default to")?;
    if !path.exists() {
        bail!("Snapshot database not found: {}", path.display());
    }
    Ok(path)
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value).context("Failed to write report")?;
    writeln!(out).context("Failed to write report")?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging first so the loader's warning reaches stderr.
    let loaded = FairkeepConfig::load();
    let config = loaded.as_ref().ok().and_then(Option::as_ref);
    init_tracing(config);
    if let Err(err) = &loaded {
        bail!("{err}");
    }

    let path = resolve_db(cli.db, config)?;
    let store = SnapshotStore::open(&path)?;
    let snapshot = store.load()?;
    tracing::info!(path = %path.display(), "loaded snapshot");

    match cli.command {
        Command::Inspect { container, player } => {
            print_json(&report::inspect(&snapshot, container, player)?)
        }
        Command::Check => print_json(&report::check(&snapshot)?),
    }
}
