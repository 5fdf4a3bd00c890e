//! SQLite persistence for ownership snapshots.
//!
//! The table itself never touches storage; the engine hands a
//! [`Snapshot`] to [`SnapshotStore::save`] and restores from
//! [`SnapshotStore::load`]. Every save replaces the previous state.

use std::fs::{DirBuilder, OpenOptions};
#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::Path;

use anyhow::{Context, Result};
use fairkeep_core::{ContainerRecord, Snapshot, WorldItemRecord};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

pub struct SnapshotStore {
    db: Connection,
}

impl SnapshotStore {
    const SCHEMA: &'static str = r"
        CREATE TABLE IF NOT EXISTS ownership_containers (
            id INTEGER PRIMARY KEY,
            container_id TEXT NOT NULL,
            item_type TEXT NOT NULL,
            ownership TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS ownership_world_items (
            id INTEGER PRIMARY KEY,
            entity_id TEXT NOT NULL,
            ownership TEXT NOT NULL
        );

        -- Single row holding the encoded ender storage sessions
        CREATE TABLE IF NOT EXISTS ender_sessions (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            data TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_ownership_containers_container
        ON ownership_containers(container_id);
    ";

    /// Open or create the snapshot database at `path`.
    ///
    /// Missing parent directories and a missing database file are created
    /// owner-only on Unix. Anything that already exists keeps its mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::create_missing(path)?;

        let db = Connection::open(path)
            .with_context(|| format!("Failed to open snapshot store at {}", path.display()))?;
        Self::initialize(db)
    }

    fn create_missing(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            let mut builder = DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            builder.mode(0o700);
            builder
                .create(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        if !path.exists() {
            let mut options = OpenOptions::new();
            options.create(true).truncate(false).read(true).write(true);
            #[cfg(unix)]
            options.mode(0o600);
            options
                .open(path)
                .with_context(|| format!("Failed to create database file: {}", path.display()))?;
        }
        Ok(())
    }

    /// Open an in-memory snapshot store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory snapshot store")?;
        Self::initialize(db)
    }

    fn initialize(db: Connection) -> Result<Self> {
        db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")
            .context("Failed to set snapshot store pragmas")?;
        db.execute_batch(Self::SCHEMA)
            .context("Failed to create snapshot store schema")?;
        Ok(Self { db })
    }

    /// Replace all stored ownership rows with `snapshot` in one transaction.
    pub fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        let tx = self
            .db
            .transaction()
            .context("Failed to start snapshot transaction")?;

        tx.execute("DELETE FROM ownership_containers", [])
            .context("Failed to clear container rows")?;
        tx.execute("DELETE FROM ownership_world_items", [])
            .context("Failed to clear world item rows")?;

        {
            let mut insert = tx
                .prepare(
                    "INSERT INTO ownership_containers (container_id, item_type, ownership)
                     VALUES (?1, ?2, ?3)",
                )
                .context("Failed to prepare container insert")?;
            for record in &snapshot.containers {
                insert
                    .execute(params![
                        &record.container_id,
                        &record.item_type,
                        &record.ownership
                    ])
                    .with_context(|| {
                        format!(
                            "Failed to insert ownership for {} / {}",
                            record.container_id, record.item_type
                        )
                    })?;
            }

            let mut insert = tx
                .prepare("INSERT INTO ownership_world_items (entity_id, ownership) VALUES (?1, ?2)")
                .context("Failed to prepare world item insert")?;
            for record in &snapshot.world_items {
                insert
                    .execute(params![&record.entity_id, &record.ownership])
                    .with_context(|| format!("Failed to insert world item {}", record.entity_id))?;
            }
        }

        tx.commit().context("Failed to commit snapshot transaction")?;
        info!(
            containers = snapshot.containers.len(),
            world_items = snapshot.world_items.len(),
            "saved ownership snapshot"
        );
        Ok(())
    }

    /// Load the stored snapshot. An empty database yields an empty snapshot.
    pub fn load(&self) -> Result<Snapshot> {
        let mut stmt = self
            .db
            .prepare(
                "SELECT container_id, item_type, ownership
                 FROM ownership_containers ORDER BY id",
            )
            .context("Failed to prepare container query")?;
        let containers = stmt
            .query_map([], |row| {
                Ok(ContainerRecord {
                    container_id: row.get(0)?,
                    item_type: row.get(1)?,
                    ownership: row.get(2)?,
                })
            })
            .context("Failed to query container rows")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read container rows")?;

        let mut stmt = self
            .db
            .prepare("SELECT entity_id, ownership FROM ownership_world_items ORDER BY id")
            .context("Failed to prepare world item query")?;
        let world_items = stmt
            .query_map([], |row| {
                Ok(WorldItemRecord {
                    entity_id: row.get(0)?,
                    ownership: row.get(1)?,
                })
            })
            .context("Failed to query world item rows")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read world item rows")?;

        Ok(Snapshot {
            containers,
            world_items,
        })
    }

    pub fn save_sessions(&self, data: &str) -> Result<()> {
        self.db
            .execute(
                "INSERT INTO ender_sessions (id, data) VALUES (1, ?1)
                 ON CONFLICT(id) DO UPDATE SET data = excluded.data",
                params![data],
            )
            .context("Failed to save ender sessions")?;
        Ok(())
    }

    pub fn load_sessions(&self) -> Result<Option<String>> {
        self.db
            .query_row("SELECT data FROM ender_sessions WHERE id = 1", [], |row| row.get(0))
            .optional()
            .context("Failed to load ender sessions")
    }
}
