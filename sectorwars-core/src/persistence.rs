//! SQLite persistence layer for the galaxy.
//!
//! Every entity kind gets its own table with the same shape:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS <collection> (
//!     id         TEXT PRIMARY KEY,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! ```
//!
//! - Records are stored as JSON inside the BLOB column; relations stay as id
//!   references and are joined by the session at load time.
//! - WAL mode for concurrent reads while the bot is running.
//! - Optional CRC-32 checksum detects save corruption.
//! - Batch writes (`create`, `save_many`) run inside one transaction, so a
//!   generation phase either lands completely or not at all.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PersistenceConfig;
use crate::error::{Result, SectorwarsError};
use crate::model::{Cluster, Outpost, Player, Record, Sector, Universe};

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

/// CRC-32 of `data` as a lowercase hex string.
fn crc32_hex(data: &[u8]) -> String {
    let crc = crc32_compute(data);
    format!("{crc:08x}")
}

/// Basic CRC-32 (ISO 3309 / ITU-T V.42) computation.
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

fn insert_sql<T: Record>() -> String {
    format!(
        "INSERT INTO {} (id, data, updated_at, checksum) VALUES (?1, ?2, ?3, ?4)",
        T::COLLECTION
    )
}

fn upsert_sql<T: Record>() -> String {
    format!(
        "INSERT INTO {} (id, data, updated_at, checksum)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            data = excluded.data,
            updated_at = excluded.updated_at,
            checksum = excluded.checksum",
        T::COLLECTION
    )
}

fn create_schema(conn: &Connection) -> Result<()> {
    for collection in [
        Universe::COLLECTION,
        Cluster::COLLECTION,
        Sector::COLLECTION,
        Outpost::COLLECTION,
        Player::COLLECTION,
    ] {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {collection} (
                id         TEXT PRIMARY KEY,
                data       BLOB NOT NULL,
                updated_at TEXT NOT NULL,
                checksum   TEXT
            );"
        ))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// PersistenceEngine
// ---------------------------------------------------------------------------

/// Handle to an open SQLite database holding one galaxy.
///
/// # Usage
///
/// ```no_run
/// # use sectorwars_core::persistence::PersistenceEngine;
/// # use sectorwars_core::config::PersistenceConfig;
/// # use sectorwars_core::model::Universe;
/// let engine = PersistenceEngine::open("galaxy.db", &PersistenceConfig::default())?;
/// let universe = Universe::new();
/// engine.save_one(&universe)?;
/// let loaded: Option<Universe> = engine.find_one(universe.id.0)?;
/// # Ok::<(), sectorwars_core::error::SectorwarsError>(())
/// ```
pub struct PersistenceEngine {
    conn: Connection,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for PersistenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceEngine")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PersistenceEngine {
    /// Open (or create) an SQLite database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SectorwarsError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        create_schema(&conn)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "Sectorwars persistence engine opened"
        );

        Ok(Self {
            conn,
            config: config.clone(),
            db_path,
        })
    }

    /// Open a throwaway in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`SectorwarsError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        create_schema(&conn)?;

        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    // ------------------------------------------------------------------
    // Collection operations
    // ------------------------------------------------------------------

    /// Every record of a collection, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`SectorwarsError::Serialization`] if a row fails to decode,
    /// or [`SectorwarsError::Database`] on SQLite failures.
    pub fn find_all<T: Record>(&self) -> Result<Vec<T>> {
        let start = Instant::now();
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT id, data, checksum FROM {} ORDER BY rowid",
            T::COLLECTION
        ))?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, data, checksum) = row?;
            records.push(self.decode::<T>(&id, &data, checksum.as_deref())?);
        }

        debug!(
            collection = T::COLLECTION,
            count = records.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Loaded collection"
        );
        Ok(records)
    }

    /// A single record by id, or `None`.
    ///
    /// # Errors
    ///
    /// Returns [`SectorwarsError::Serialization`] if the row fails to decode,
    /// or [`SectorwarsError::Database`] on SQLite failures.
    pub fn find_one<T: Record>(&self, id: Uuid) -> Result<Option<T>> {
        let id_str = id.to_string();
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT data, checksum FROM {} WHERE id = ?1",
            T::COLLECTION
        ))?;

        let result: Option<(Vec<u8>, Option<String>)> = stmt
            .query_row(params![id_str], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        let Some((data, checksum)) = result else {
            return Ok(None);
        };
        self.decode::<T>(&id_str, &data, checksum.as_deref()).map(Some)
    }

    /// Insert new records in one transaction. Fails if any id already exists.
    ///
    /// # Errors
    ///
    /// Returns [`SectorwarsError::Database`] on SQLite failures (including
    /// primary-key conflicts); nothing is written in that case.
    pub fn create<T: Record>(&self, records: &[T]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        self.write_rows(&tx, records, &insert_sql::<T>())?;
        tx.commit()?;
        Ok(())
    }

    /// Upsert a single record.
    ///
    /// # Errors
    ///
    /// Returns [`SectorwarsError::Serialization`] if JSON encoding fails, or
    /// [`SectorwarsError::Database`] on SQLite failures.
    pub fn save_one<T: Record>(&self, record: &T) -> Result<()> {
        self.save_many(std::slice::from_ref(record))
    }

    /// Upsert many records in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`SectorwarsError::Serialization`] if JSON encoding fails, or
    /// [`SectorwarsError::Database`] on SQLite failures; nothing is written
    /// in that case.
    pub fn save_many<T: Record>(&self, records: &[T]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        self.write_rows(&tx, records, &upsert_sql::<T>())?;
        tx.commit()?;
        Ok(())
    }

    /// Insert `created` and upsert `updated` in a single transaction.
    ///
    /// Used where a new record and the aggregate that lists it must land
    /// together, such as a player and the universe roster.
    ///
    /// # Errors
    ///
    /// Returns [`SectorwarsError::Serialization`] or
    /// [`SectorwarsError::Database`]; neither collection is touched in that
    /// case.
    pub fn create_and_save<C: Record, U: Record>(&self, created: &[C], updated: &[U]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        self.write_rows(&tx, created, &insert_sql::<C>())?;
        self.write_rows(&tx, updated, &upsert_sql::<U>())?;
        tx.commit()?;
        Ok(())
    }

    /// Delete every record of a collection, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`SectorwarsError::Database`] on SQLite failures.
    pub fn remove_all<T: Record>(&self) -> Result<usize> {
        let removed = self
            .conn
            .execute(&format!("DELETE FROM {}", T::COLLECTION), [])?;
        debug!(collection = T::COLLECTION, removed, "Removed collection");
        Ok(removed)
    }

    /// Number of records in a collection.
    ///
    /// # Errors
    ///
    /// Returns [`SectorwarsError::Database`] on SQLite failures.
    pub fn count<T: Record>(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", T::COLLECTION),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn write_rows<T: Record>(&self, tx: &Transaction<'_>, records: &[T], sql: &str) -> Result<()> {
        let start = Instant::now();
        let now = Utc::now().to_rfc3339();
        let mut bytes = 0usize;

        let mut stmt = tx.prepare_cached(sql)?;
        for record in records {
            let json = serde_json::to_vec(record)
                .map_err(|e| SectorwarsError::Serialization(e.to_string()))?;
            let checksum = self.config.checksum_enabled.then(|| crc32_hex(&json));
            bytes += json.len();
            stmt.execute(params![record.key().to_string(), json, now, checksum])?;
        }

        debug!(
            collection = T::COLLECTION,
            records = records.len(),
            bytes,
            elapsed_us = start.elapsed().as_micros(),
            "Wrote records"
        );
        Ok(())
    }

    fn decode<T: Record>(&self, id: &str, data: &[u8], stored: Option<&str>) -> Result<T> {
        if self.config.checksum_enabled {
            if let Some(expected) = stored {
                let actual = crc32_hex(data);
                if expected != actual {
                    warn!(
                        collection = T::COLLECTION,
                        id = %id,
                        expected = %expected,
                        actual = %actual,
                        "Checksum mismatch, possible save corruption"
                    );
                }
            }
        }
        serde_json::from_slice(data).map_err(|e| SectorwarsError::Serialization(e.to_string()))
    }

    // ------------------------------------------------------------------
    // Backup
    // ------------------------------------------------------------------

    /// Back the database up to `dest_path` using SQLite's online-backup API.
    ///
    /// # Errors
    ///
    /// Returns [`SectorwarsError::Database`] on SQLite failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;

        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "Galaxy backup written"
        );
        Ok(())
    }

    /// Create a numbered backup alongside the database file, rotating old
    /// backups so that at most `config.backup_count` are kept.
    ///
    /// # Errors
    ///
    /// Returns [`SectorwarsError::Database`] or [`SectorwarsError::Io`] on failure.
    pub fn create_rotating_backup(&self) -> Result<()> {
        if self.db_path.as_os_str() == ":memory:" {
            return Ok(());
        }

        let max = self.config.backup_count;
        if max == 0 {
            return Ok(());
        }

        for i in (1..max).rev() {
            let src = self.backup_path(i);
            let dst = self.backup_path(i + 1);
            if src.exists() {
                std::fs::rename(&src, &dst)?;
            }
        }

        let oldest = self.backup_path(max + 1);
        if oldest.exists() {
            std::fs::remove_file(&oldest)?;
        }

        self.backup(self.backup_path(1))?;
        info!(max_backups = max, "Rotating backup created");
        Ok(())
    }

    /// Path to a numbered backup file (e.g. `sectorwars.db.bak.1`).
    fn backup_path(&self, n: u32) -> PathBuf {
        let mut p = self.db_path.clone();
        let ext = format!(
            "{}.bak.{n}",
            p.extension()
                .map_or(String::new(), |e| e.to_string_lossy().into_owned())
        );
        p.set_extension(ext);
        p
    }

    // ------------------------------------------------------------------
    // Utility
    // ------------------------------------------------------------------

    /// Path to the database file (or `:memory:`).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run SQLite's integrity check. `Ok(false)` means corruption.
    ///
    /// # Errors
    ///
    /// Returns [`SectorwarsError::Database`] if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Adds `.optional()` to `rusqlite::Result`, turning
/// `QueryReturnedNoRows` into `Ok(None)`.
trait OptionalExt<T> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
