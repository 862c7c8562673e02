//! Frontier statistics
//!
//! This module provides functionality for extracting and displaying
//! frontier progress from the storage layer.

use crate::state::UrlStatus;
use crate::storage::{FrontierStore, RunRecord, StorageResult};

/// Frontier statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontierStatistics {
    /// Total number of URLs ever admitted
    pub total: u64,

    /// URLs waiting to be crawled
    pub pending: u64,

    /// URLs currently held by a worker
    pub reserved: u64,

    /// URLs whose extraction has finished
    pub done: u64,
}

impl FrontierStatistics {
    /// Fraction of admitted URLs that are Done, as a percentage
    pub fn percent_done(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.done as f64 / self.total as f64) * 100.0
        }
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(FrontierStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn FrontierStore) -> StorageResult<FrontierStatistics> {
    let counts = storage.status_counts()?;
    let count = |status: UrlStatus| counts.get(&status).copied().unwrap_or(0);

    Ok(FrontierStatistics {
        total: storage.count_total()?,
        pending: count(UrlStatus::Pending),
        reserved: count(UrlStatus::Reserved),
        done: count(UrlStatus::Done),
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
/// * `latest_run` - The most recent crawl run, if any
pub fn print_statistics(stats: &FrontierStatistics, latest_run: Option<&RunRecord>) {
    println!("=== Frontier Statistics ===\n");

    println!("URLs:");
    println!("  Total admitted: {}", stats.total);
    println!("  Pending: {}", stats.pending);
    println!("  Reserved: {}", stats.reserved);
    println!("  Done: {} ({:.1}%)", stats.done, stats.percent_done());
    println!();

    match latest_run {
        Some(run) => {
            println!("Latest run:");
            println!("  ID: {}", run.id);
            println!("  Started: {}", run.started_at);
            println!(
                "  Finished: {}",
                run.finished_at.as_deref().unwrap_or("(not finished)")
            );
            println!("  Status: {}", run.status.to_db_string());
            println!("  Config hash: {}", run.config_hash);
        }
        None => println!("No runs recorded."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    #[test]
    fn test_load_statistics() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.insert_url("https://ics.uci.edu/1").unwrap();
        store.insert_url("https://ics.uci.edu/2").unwrap();
        store.insert_url("https://ics.uci.edu/3").unwrap();
        store.reserve_next().unwrap();
        store.reserve_next().unwrap();
        store
            .transition("https://ics.uci.edu/1", UrlStatus::Reserved, UrlStatus::Done)
            .unwrap();

        let stats = load_statistics(&store).unwrap();
        assert_eq!(
            stats,
            FrontierStatistics {
                total: 3,
                pending: 1,
                reserved: 1,
                done: 1,
            }
        );
    }

    #[test]
    fn test_percent_done() {
        let stats = FrontierStatistics {
            total: 4,
            done: 1,
            ..Default::default()
        };
        assert!((stats.percent_done() - 25.0).abs() < f64::EPSILON);
        assert_eq!(FrontierStatistics::default().percent_done(), 0.0);
    }
}
