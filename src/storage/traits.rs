//! Storage traits and error types
//!
//! This module defines the trait interface for frontier storage backends and
//! associated error types.

use crate::state::UrlStatus;
use crate::storage::{RunRecord, RunStatus, UrlRecord};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Invalid status transition for {url}: {from} -> {to}")]
    InvalidTransition {
        url: String,
        from: UrlStatus,
        to: UrlStatus,
    },

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Frontier lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for frontier storage backends
///
/// Every mutating call must be durable when it returns. Callers serialize
/// access (the frontier keeps the store behind a single mutex), so
/// implementations do not need their own locking.
pub trait FrontierStore {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run and stamps its finish time
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== URL Management =====

    /// Inserts a URL as Pending unless it is already known
    ///
    /// # Returns
    ///
    /// `true` if a new record was created, `false` if the URL was present
    /// in any status
    fn insert_url(&mut self, url: &str) -> StorageResult<bool>;

    /// Gets a URL record by its canonical string
    fn get_url(&self, url: &str) -> StorageResult<Option<UrlRecord>>;

    /// Atomically marks the oldest Pending URL as Reserved and returns it
    fn reserve_next(&mut self) -> StorageResult<Option<UrlRecord>>;

    /// Moves a URL from `from` to `to`
    ///
    /// # Returns
    ///
    /// `true` if the URL was in status `from` and has been updated,
    /// `false` if it was unknown or in another status
    fn transition(&mut self, url: &str, from: UrlStatus, to: UrlStatus) -> StorageResult<bool>;

    /// Returns every Reserved URL to Pending (crash recovery)
    ///
    /// # Returns
    ///
    /// The number of records reset
    fn reset_reserved(&mut self) -> StorageResult<u64>;

    /// Deletes every URL record
    fn clear_urls(&mut self) -> StorageResult<()>;

    // ===== Statistics =====

    /// Counts URLs in a specific status
    fn count_by_status(&self, status: UrlStatus) -> StorageResult<u64>;

    /// Gets the number of URLs in every status
    fn status_counts(&self) -> StorageResult<HashMap<UrlStatus, u64>>;

    /// Gets total URL count
    fn count_total(&self) -> StorageResult<u64>;
}
