//! Persistent, deduplicating crawl frontier
//!
//! The frontier is the single source of crawl truth. Every canonical URL is
//! stored once with a [`UrlStatus`]; workers draw Pending URLs in insertion
//! order, hold them Reserved while they fetch, and mark them Done afterwards.
//! All operations go through one mutex around the store and every transition
//! is committed before the call returns, so the frontier can be resumed after
//! a crash.

mod stats;

pub use stats::{load_statistics, print_statistics, FrontierStatistics};

use crate::state::UrlStatus;
use crate::storage::{FrontierStore, RunRecord, RunStatus, SqliteStore, StorageError, StorageResult};
use crate::url::{canonicalize_str, UrlFilter};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// How an existing frontier database is treated when opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontierMode {
    /// Discard every stored URL and start from the seeds
    Fresh,
    /// Keep stored URLs; reservations left by a crashed run become Pending
    Resume,
}

/// Answer to a worker asking for work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextUrl {
    /// A URL now reserved for the caller
    Ready(String),
    /// Nothing is Pending but other workers still hold reservations that
    /// may produce new links; ask again shortly
    Busy,
    /// Nothing is Pending or Reserved; the crawl is finished
    Exhausted,
}

/// Shared work queue for all workers
pub struct Frontier {
    store: Mutex<Box<dyn FrontierStore + Send>>,
    filter: Arc<UrlFilter>,
}

impl Frontier {
    /// Opens (or creates) the frontier database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `mode` - Whether to start over or resume the stored state
    /// * `filter` - Eligibility filter re-applied to every drawn URL
    pub fn open(path: &Path, mode: FrontierMode, filter: Arc<UrlFilter>) -> StorageResult<Self> {
        let store = SqliteStore::new(path)?;
        Self::with_store(Box::new(store), mode, filter)
    }

    /// Builds a frontier over an already opened store
    pub fn with_store(
        mut store: Box<dyn FrontierStore + Send>,
        mode: FrontierMode,
        filter: Arc<UrlFilter>,
    ) -> StorageResult<Self> {
        match mode {
            FrontierMode::Fresh => {
                store.clear_urls()?;
                info!("Starting fresh frontier");
            }
            FrontierMode::Resume => {
                let reset = store.reset_reserved()?;
                let total = store.count_total()?;
                info!(
                    "Resuming frontier with {} URLs ({} interrupted reservations returned to pending)",
                    total, reset
                );
            }
        }

        Ok(Self {
            store: Mutex::new(store),
            filter,
        })
    }

    fn store(&self) -> StorageResult<MutexGuard<'_, Box<dyn FrontierStore + Send>>> {
        self.store.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Returns the eligibility filter shared with the workers
    pub fn filter(&self) -> &Arc<UrlFilter> {
        &self.filter
    }

    /// Enqueues every seed URL
    ///
    /// Seeds already known to the frontier are left untouched, so seeding a
    /// resumed frontier is harmless.
    ///
    /// # Returns
    ///
    /// The number of seeds that were new
    pub fn seed<S: AsRef<str>>(&self, seeds: &[S]) -> StorageResult<usize> {
        let mut added = 0;
        for seed in seeds {
            if self.enqueue(seed.as_ref())? {
                added += 1;
            }
        }
        info!("Seeded frontier with {} new URLs", added);
        Ok(added)
    }

    /// Adds a URL as Pending unless its canonical form is already known
    ///
    /// URLs that cannot be canonicalized are dropped.
    ///
    /// # Returns
    ///
    /// `true` if a new record was created
    pub fn enqueue(&self, url: &str) -> StorageResult<bool> {
        let canonical = match canonicalize_str(url) {
            Ok(canonical) => canonical,
            Err(e) => {
                debug!("Not enqueueing {}: {}", url, e);
                return Ok(false);
            }
        };

        self.store()?.insert_url(canonical.as_str())
    }

    /// Reserves the next Pending URL for the caller
    ///
    /// Drawn URLs that no longer pass the filter are marked Done and skipped.
    pub fn next(&self) -> StorageResult<NextUrl> {
        let mut store = self.store()?;

        loop {
            let record = match store.reserve_next()? {
                Some(record) => record,
                None => {
                    return if store.count_by_status(UrlStatus::Reserved)? > 0 {
                        Ok(NextUrl::Busy)
                    } else {
                        Ok(NextUrl::Exhausted)
                    };
                }
            };

            if self.filter.is_eligible_str(&record.url) {
                return Ok(NextUrl::Ready(record.url));
            }

            debug!("Dropping ineligible frontier entry {}", record.url);
            store.transition(&record.url, UrlStatus::Reserved, UrlStatus::Done)?;
        }
    }

    /// Marks a Reserved URL as Done
    ///
    /// Unknown, Pending and already Done URLs are left unchanged.
    ///
    /// # Returns
    ///
    /// `true` if the URL was Reserved and is now Done
    pub fn complete(&self, url: &str) -> StorageResult<bool> {
        let canonical = match canonicalize_str(url) {
            Ok(canonical) => canonical,
            Err(_) => return Ok(false),
        };

        self.store()?
            .transition(canonical.as_str(), UrlStatus::Reserved, UrlStatus::Done)
    }

    /// Returns the current status of a URL, if known
    pub fn status_of(&self, url: &str) -> StorageResult<Option<UrlStatus>> {
        let canonical = match canonicalize_str(url) {
            Ok(canonical) => canonical,
            Err(_) => return Ok(None),
        };

        Ok(self
            .store()?
            .get_url(canonical.as_str())?
            .map(|record| record.status))
    }

    /// Counts URLs by status
    pub fn statistics(&self) -> StorageResult<FrontierStatistics> {
        let store = self.store()?;
        load_statistics(&**store)
    }

    // ===== Run Tracking =====

    /// Records the start of a crawl run
    pub fn start_run(&self, config_hash: &str) -> StorageResult<i64> {
        self.store()?.create_run(config_hash)
    }

    /// Gets the most recent run, if any
    pub fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        self.store()?.get_latest_run()
    }

    /// Records the end of a crawl run
    pub fn finish_run(&self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        self.store()?.finish_run(run_id, status)
    }
}
