//! SQLite-backed inventory store.
//!
//! One table, keyed by normalized relative path. The store serializes all
//! access through a single connection behind a mutex: the active job writes
//! in bulk (upserts, hash writes) while readers (grouper, stats) take
//! whatever snapshot the database currently holds.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{FileRecord, InventoryError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS files (
    path       TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    size       INTEGER NOT NULL,
    mtime      INTEGER NOT NULL,
    hash       TEXT,
    scanned_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_files_size ON files (size);
CREATE INDEX IF NOT EXISTS idx_files_hash ON files (hash);
";

/// Aggregate counters over the whole inventory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Number of inventory records.
    pub total_files: u64,
    /// Records with a computed digest.
    pub hashed_files: u64,
    /// Sum of all record sizes in bytes.
    pub total_size: u64,
    /// Bytes reclaimable by deleting all but one member of every duplicate group.
    pub wasted_space: u64,
}

/// Persistent inventory of scanned files.
pub struct InventoryStore {
    conn: Mutex<Connection>,
}

impl InventoryStore {
    /// Open (or create) the inventory database at `path`.
    pub fn open(path: &Path) -> Result<Self, InventoryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| InventoryError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(SCHEMA)?;
        log::debug!("Opened inventory database at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory inventory. Used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self, InventoryError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock only means another thread panicked mid-query;
        // the connection itself is still usable.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a record for `path`, or refresh `size`/`mtime`/`scanned_at` in
    /// place if one exists. A stored `hash` survives the update untouched.
    pub fn upsert(
        &self,
        path: &str,
        name: &str,
        size: u64,
        mtime: DateTime<Utc>,
    ) -> Result<(), InventoryError> {
        self.conn().execute(
            "INSERT INTO files (path, name, size, mtime, hash, scanned_at)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5)
             ON CONFLICT(path) DO UPDATE SET
                 size = excluded.size,
                 mtime = excluded.mtime,
                 scanned_at = excluded.scanned_at",
            params![
                path,
                name,
                size as i64,
                mtime.timestamp_millis(),
                Utc::now().timestamp_millis()
            ],
        )?;
        Ok(())
    }

    /// Look up a single record by its normalized relative path.
    pub fn get(&self, path: &str) -> Result<Option<FileRecord>, InventoryError> {
        let record = self
            .conn()
            .query_row(
                "SELECT path, name, size, mtime, hash, scanned_at FROM files WHERE path = ?1",
                params![path],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Persist a computed content digest for `path`.
    pub fn set_hash(&self, path: &str, hash: &str) -> Result<(), InventoryError> {
        self.conn().execute(
            "UPDATE files SET hash = ?2 WHERE path = ?1",
            params![path, hash],
        )?;
        Ok(())
    }

    /// Records eligible for hashing: size shared with at least one other
    /// record, digest not yet computed. This is the lazy invariant — hashing
    /// work is bounded by size collisions, not total file count.
    pub fn hash_candidates(&self) -> Result<Vec<FileRecord>, InventoryError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT path, name, size, mtime, hash, scanned_at FROM files
             WHERE hash IS NULL
               AND size IN (SELECT size FROM files GROUP BY size HAVING COUNT(*) > 1)
             ORDER BY size DESC, path",
        )?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// All records whose digest is shared with at least one other record.
    /// Raw material for duplicate-group materialization.
    pub fn hashed_duplicates(&self) -> Result<Vec<FileRecord>, InventoryError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT path, name, size, mtime, hash, scanned_at FROM files
             WHERE hash IS NOT NULL
               AND hash IN (SELECT hash FROM files WHERE hash IS NOT NULL
                            GROUP BY hash HAVING COUNT(*) > 1)",
        )?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Remove the record for `path`. Returns whether a row existed.
    ///
    /// Callers must delete the underlying file first; see
    /// [`DeletionExecutor`](crate::actions::DeletionExecutor).
    pub fn delete(&self, path: &str) -> Result<bool, InventoryError> {
        let affected = self
            .conn()
            .execute("DELETE FROM files WHERE path = ?1", params![path])?;
        Ok(affected > 0)
    }

    /// Aggregate counters over the current inventory contents.
    pub fn stats(&self) -> Result<ScanStats, InventoryError> {
        let conn = self.conn();
        let (total_files, hashed_files, total_size): (i64, i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(hash), COALESCE(SUM(size), 0) FROM files",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        let wasted_space: i64 = conn.query_row(
            "SELECT COALESCE(SUM(size * (cnt - 1)), 0) FROM (
                 SELECT size, COUNT(*) AS cnt FROM files
                 WHERE hash IS NOT NULL GROUP BY hash
             )",
            [],
            |row| row.get(0),
        )?;
        Ok(ScanStats {
            total_files: total_files as u64,
            hashed_files: hashed_files as u64,
            total_size: total_size as u64,
            wasted_space: wasted_space as u64,
        })
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    let size: i64 = row.get(2)?;
    let mtime_ms: i64 = row.get(3)?;
    let scanned_ms: i64 = row.get(5)?;
    Ok(FileRecord {
        path: row.get(0)?,
        name: row.get(1)?,
        size: size as u64,
        mtime: DateTime::from_timestamp_millis(mtime_ms).unwrap_or_default(),
        hash: row.get(4)?,
        scanned_at: DateTime::from_timestamp_millis(scanned_ms).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InventoryStore {
        InventoryStore::open_in_memory().unwrap()
    }

    #[test]
    fn upsert_creates_then_updates_in_place() {
        let s = store();
        let t0 = Utc::now();
        s.upsert("a.txt", "a.txt", 100, t0).unwrap();
        s.set_hash("a.txt", "deadbeef").unwrap();

        // Re-scan with a new size: same row, hash preserved.
        s.upsert("a.txt", "a.txt", 150, t0).unwrap();

        let rec = s.get("a.txt").unwrap().unwrap();
        assert_eq!(rec.size, 150);
        assert_eq!(rec.hash.as_deref(), Some("deadbeef"));
        assert_eq!(s.stats().unwrap().total_files, 1);
    }

    #[test]
    fn hash_candidates_requires_size_collision() {
        let s = store();
        let t = Utc::now();
        s.upsert("a.txt", "a.txt", 100, t).unwrap();
        s.upsert("b.txt", "b.txt", 100, t).unwrap();
        s.upsert("c.txt", "c.txt", 200, t).unwrap();

        let candidates = s.hash_candidates().unwrap();
        let paths: Vec<_> = candidates.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["a.txt", "b.txt"]);
    }

    #[test]
    fn hash_candidates_skips_already_hashed() {
        let s = store();
        let t = Utc::now();
        s.upsert("a.txt", "a.txt", 100, t).unwrap();
        s.upsert("b.txt", "b.txt", 100, t).unwrap();
        s.set_hash("a.txt", "aa").unwrap();

        let candidates = s.hash_candidates().unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].path, "b.txt");
    }

    #[test]
    fn hashed_duplicates_excludes_unique_hashes() {
        let s = store();
        let t = Utc::now();
        for (path, hash) in [("a", "h1"), ("b", "h1"), ("c", "h2")] {
            s.upsert(path, path, 10, t).unwrap();
            s.set_hash(path, hash).unwrap();
        }
        let dups = s.hashed_duplicates().unwrap();
        assert_eq!(dups.len(), 2);
        assert!(dups.iter().all(|r| r.hash.as_deref() == Some("h1")));
    }

    #[test]
    fn delete_reports_missing_row() {
        let s = store();
        assert!(!s.delete("ghost.txt").unwrap());
        s.upsert("real.txt", "real.txt", 1, Utc::now()).unwrap();
        assert!(s.delete("real.txt").unwrap());
        assert!(s.get("real.txt").unwrap().is_none());
    }

    #[test]
    fn stats_counts_and_wasted_space() {
        let s = store();
        let t = Utc::now();
        for (path, size, hash) in [
            ("a", 1000, Some("h1")),
            ("b", 1000, Some("h1")),
            ("c", 1000, Some("h2")),
            ("d", 500, None),
        ] {
            s.upsert(path, path, size, t).unwrap();
            if let Some(h) = hash {
                s.set_hash(path, h).unwrap();
            }
        }
        let stats = s.stats().unwrap();
        assert_eq!(stats.total_files, 4);
        assert_eq!(stats.hashed_files, 3);
        assert_eq!(stats.total_size, 3500);
        // Only the h1 group wastes space: 1000 * (2 - 1).
        assert_eq!(stats.wasted_space, 1000);
    }
}
