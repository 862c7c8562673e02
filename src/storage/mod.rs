//! Storage module for persisting the frontier
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - URL status persistence for the frontier
//! - Run tracking and resumption support

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{FrontierStore, StorageError, StorageResult};

use crate::state::UrlStatus;
use std::path::Path;

/// Initializes or opens a frontier database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::new(path)
}

/// Represents a URL in the frontier
#[derive(Debug, Clone)]
pub struct UrlRecord {
    pub id: i64,
    pub url: String,
    pub status: UrlStatus,
    pub discovered_at: String,
    pub completed_at: Option<String>,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
