//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the FrontierStore trait.

use crate::state::UrlStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{FrontierStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, UrlRecord};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// Every committed statement is flushed to disk before it returns, so a
    /// crash never loses a status transition that a caller has observed.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
    })
}

/// Reads a URL row, keeping the raw status text for validation by the caller
fn url_from_row(row: &Row<'_>) -> rusqlite::Result<(UrlRecord, String)> {
    let status: String = row.get(2)?;
    Ok((
        UrlRecord {
            id: row.get(0)?,
            url: row.get(1)?,
            status: UrlStatus::from_db_string(&status).unwrap_or(UrlStatus::Pending),
            discovered_at: row.get(3)?,
            completed_at: row.get(4)?,
        },
        status,
    ))
}

fn checked(record: (UrlRecord, String)) -> StorageResult<UrlRecord> {
    let (record, raw_status) = record;
    if UrlStatus::from_db_string(&raw_status).is_none() {
        return Err(StorageError::Corrupt(format!(
            "unknown status '{}' for {}",
            raw_status, record.url
        )));
    }
    Ok(record)
}

impl FrontierStore for SqliteStore {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== URL Management =====

    fn insert_url(&mut self, url: &str) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO urls (url, status, discovered_at) VALUES (?1, ?2, ?3)",
            params![url, UrlStatus::Pending.to_db_string(), now],
        )?;
        Ok(inserted > 0)
    }

    fn get_url(&self, url: &str) -> StorageResult<Option<UrlRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, url, status, discovered_at, completed_at FROM urls WHERE url = ?1",
                params![url],
                url_from_row,
            )
            .optional()?;

        record.map(checked).transpose()
    }

    fn reserve_next(&mut self) -> StorageResult<Option<UrlRecord>> {
        let tx = self.conn.transaction()?;

        let next = tx
            .query_row(
                "SELECT id, url, status, discovered_at, completed_at FROM urls
                 WHERE status = ?1 ORDER BY id ASC LIMIT 1",
                params![UrlStatus::Pending.to_db_string()],
                url_from_row,
            )
            .optional()?;

        let mut record = match next {
            Some(row) => checked(row)?,
            None => return Ok(None),
        };

        tx.execute(
            "UPDATE urls SET status = ?1 WHERE id = ?2",
            params![UrlStatus::Reserved.to_db_string(), record.id],
        )?;
        tx.commit()?;

        record.status = UrlStatus::Reserved;
        Ok(Some(record))
    }

    fn transition(&mut self, url: &str, from: UrlStatus, to: UrlStatus) -> StorageResult<bool> {
        if !from.can_transition_to(to) {
            return Err(StorageError::InvalidTransition {
                url: url.to_string(),
                from,
                to,
            });
        }

        let completed_at = if to.is_terminal() {
            Some(Utc::now().to_rfc3339())
        } else {
            None
        };

        let updated = self.conn.execute(
            "UPDATE urls SET status = ?1, completed_at = ?2 WHERE url = ?3 AND status = ?4",
            params![to.to_db_string(), completed_at, url, from.to_db_string()],
        )?;
        Ok(updated > 0)
    }

    fn reset_reserved(&mut self) -> StorageResult<u64> {
        let reset = self.conn.execute(
            "UPDATE urls SET status = ?1 WHERE status = ?2",
            params![
                UrlStatus::Pending.to_db_string(),
                UrlStatus::Reserved.to_db_string()
            ],
        )?;
        Ok(reset as u64)
    }

    fn clear_urls(&mut self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM urls", [])?;
        Ok(())
    }

    // ===== Statistics =====

    fn count_by_status(&self, status: UrlStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM urls WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn status_counts(&self) -> StorageResult<HashMap<UrlStatus, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM urls GROUP BY status")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = HashMap::new();
        for (status, count) in rows {
            let status = UrlStatus::from_db_string(&status)
                .ok_or_else(|| StorageError::Corrupt(format!("unknown status '{}'", status)))?;
            counts.insert(status, count as u64);
        }
        Ok(counts)
    }

    fn count_total(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM urls", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_in_memory() {
        let storage = SqliteStore::new_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_run_lifecycle() {
        let mut storage = SqliteStore::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();
        assert!(run_id > 0);

        let run = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(run.id, run_id);
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.finished_at.is_none());

        storage.finish_run(run_id, RunStatus::Completed).unwrap();
        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_unknown_run() {
        let mut storage = SqliteStore::new_in_memory().unwrap();
        assert!(matches!(
            storage.get_run(42),
            Err(StorageError::RunNotFound(42))
        ));
        assert!(storage.finish_run(42, RunStatus::Failed).is_err());
    }

    #[test]
    fn test_insert_duplicate_url() {
        let mut storage = SqliteStore::new_in_memory().unwrap();

        assert!(storage.insert_url("https://ics.uci.edu/").unwrap());
        assert!(!storage.insert_url("https://ics.uci.edu/").unwrap());
        assert_eq!(storage.count_total().unwrap(), 1);
    }

    #[test]
    fn test_reserve_in_insertion_order() {
        let mut storage = SqliteStore::new_in_memory().unwrap();
        storage.insert_url("https://ics.uci.edu/b").unwrap();
        storage.insert_url("https://ics.uci.edu/a").unwrap();

        let first = storage.reserve_next().unwrap().unwrap();
        let second = storage.reserve_next().unwrap().unwrap();
        assert_eq!(first.url, "https://ics.uci.edu/b");
        assert_eq!(first.status, UrlStatus::Reserved);
        assert_eq!(second.url, "https://ics.uci.edu/a");
        assert!(storage.reserve_next().unwrap().is_none());
    }

    #[test]
    fn test_transition_is_conditional() {
        let mut storage = SqliteStore::new_in_memory().unwrap();
        storage.insert_url("https://ics.uci.edu/").unwrap();

        // Pending cannot be completed as if it were Reserved
        assert!(!storage
            .transition("https://ics.uci.edu/", UrlStatus::Reserved, UrlStatus::Done)
            .unwrap());

        storage.reserve_next().unwrap();
        assert!(storage
            .transition("https://ics.uci.edu/", UrlStatus::Reserved, UrlStatus::Done)
            .unwrap());

        let record = storage.get_url("https://ics.uci.edu/").unwrap().unwrap();
        assert_eq!(record.status, UrlStatus::Done);
        assert!(record.completed_at.is_some());
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let mut storage = SqliteStore::new_in_memory().unwrap();
        let result = storage.transition("https://ics.uci.edu/", UrlStatus::Done, UrlStatus::Pending);
        assert!(matches!(result, Err(StorageError::InvalidTransition { .. })));
    }

    #[test]
    fn test_reset_reserved() {
        let mut storage = SqliteStore::new_in_memory().unwrap();
        storage.insert_url("https://ics.uci.edu/1").unwrap();
        storage.insert_url("https://ics.uci.edu/2").unwrap();
        storage.reserve_next().unwrap();

        assert_eq!(storage.reset_reserved().unwrap(), 1);
        assert_eq!(storage.count_by_status(UrlStatus::Pending).unwrap(), 2);
    }

    #[test]
    fn test_status_counts() {
        let mut storage = SqliteStore::new_in_memory().unwrap();
        for i in 0..3 {
            storage.insert_url(&format!("https://ics.uci.edu/{}", i)).unwrap();
        }
        storage.reserve_next().unwrap();

        let counts = storage.status_counts().unwrap();
        assert_eq!(counts.get(&UrlStatus::Pending), Some(&2));
        assert_eq!(counts.get(&UrlStatus::Reserved), Some(&1));
        assert_eq!(counts.get(&UrlStatus::Done), None);
    }

    #[test]
    fn test_clear_urls() {
        let mut storage = SqliteStore::new_in_memory().unwrap();
        storage.insert_url("https://ics.uci.edu/").unwrap();
        storage.clear_urls().unwrap();
        assert_eq!(storage.count_total().unwrap(), 0);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frontier.db");

        {
            let mut storage = SqliteStore::new(&path).unwrap();
            storage.insert_url("https://ics.uci.edu/").unwrap();
        }

        let storage = SqliteStore::new(&path).unwrap();
        assert_eq!(storage.count_total().unwrap(), 1);
    }
}
