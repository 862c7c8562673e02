//! Crawl worker loop
//!
//! A worker repeatedly draws a URL from the frontier, waits for its host's
//! politeness slot, fetches it, extracts links, enqueues the eligible ones
//! and marks the URL Done. It stops when the frontier is exhausted.

use crate::crawler::extractor::Extractor;
use crate::crawler::fetcher::Fetch;
use crate::crawler::politeness::Politeness;
use crate::frontier::{Frontier, NextUrl};
use crate::storage::StorageResult;
use crate::url::extract_domain;
use crate::CrawlerError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Pages between progress log lines
const PROGRESS_INTERVAL: u64 = 10;

/// What a worker did before the frontier ran dry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub pages_processed: u64,
    pub links_enqueued: u64,
}

/// A URL this worker has reserved
///
/// Dropping it without calling [`Reservation::complete`] still marks the URL
/// Done, so an error or a panic while processing never leaves it Reserved.
struct Reservation<'a> {
    frontier: &'a Frontier,
    url: String,
    completed: bool,
}

impl<'a> Reservation<'a> {
    fn new(frontier: &'a Frontier, url: String) -> Self {
        Self {
            frontier,
            url,
            completed: false,
        }
    }

    fn complete(mut self) -> StorageResult<bool> {
        self.completed = true;
        self.frontier.complete(&self.url)
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        match self.frontier.complete(&self.url) {
            Ok(_) => warn!("Abandoned {} after a failure, marked Done", self.url),
            Err(e) => warn!("Failed to close reservation of {}: {}", self.url, e),
        }
    }
}

/// One crawl worker sharing the frontier, politeness table and analytics
pub struct Worker<F: Fetch> {
    id: usize,
    frontier: Arc<Frontier>,
    politeness: Arc<Politeness>,
    extractor: Extractor,
    fetcher: Arc<F>,
    idle_poll: Duration,
}

impl<F: Fetch> Worker<F> {
    pub fn new(
        id: usize,
        frontier: Arc<Frontier>,
        politeness: Arc<Politeness>,
        extractor: Extractor,
        fetcher: Arc<F>,
        idle_poll: Duration,
    ) -> Self {
        Self {
            id,
            frontier,
            politeness,
            extractor,
            fetcher,
            idle_poll,
        }
    }

    /// Runs until the frontier is exhausted
    ///
    /// # Returns
    ///
    /// * `Ok(WorkerReport)` - The frontier has no Pending or Reserved URLs left
    /// * `Err(CrawlerError)` - The frontier store failed
    ///
    /// The URL in hand is marked Done on every exit path.
    pub async fn run(self) -> Result<WorkerReport, CrawlerError> {
        info!("Worker {} started", self.id);
        let mut report = WorkerReport::default();

        loop {
            let url = match self.frontier.next()? {
                NextUrl::Ready(url) => url,
                NextUrl::Busy => {
                    tokio::time::sleep(self.idle_poll).await;
                    continue;
                }
                NextUrl::Exhausted => break,
            };

            let reservation = Reservation::new(&self.frontier, url);
            report.links_enqueued += self.process(&reservation.url).await?;
            reservation.complete()?;
            report.pages_processed += 1;

            if report.pages_processed % PROGRESS_INTERVAL == 0 {
                let stats = self.frontier.statistics()?;
                info!(
                    "Worker {}: {} pages processed, {} links enqueued; frontier {} pending, {} reserved, {} done",
                    self.id,
                    report.pages_processed,
                    report.links_enqueued,
                    stats.pending,
                    stats.reserved,
                    stats.done
                );
            }
        }

        info!(
            "Worker {} finished: frontier exhausted after {} pages",
            self.id, report.pages_processed
        );
        Ok(report)
    }

    /// Fetches one reserved URL and enqueues its eligible links
    ///
    /// Returns the number of links that were new to the frontier.
    async fn process(&self, url: &str) -> Result<u64, CrawlerError> {
        let host = match Url::parse(url).ok().as_ref().and_then(extract_domain) {
            Some(host) => host,
            None => {
                warn!("Worker {}: no host in {}, skipping", self.id, url);
                return Ok(0);
            }
        };

        self.politeness.wait_for_slot(&host).await;

        let response = self.fetcher.fetch(url).await;
        match &response.error {
            Some(error) => info!(
                "Downloaded {}, status <{}>, error <{}>",
                url, response.status, error
            ),
            None => info!("Downloaded {}, status <{}>", url, response.status),
        }

        let filter = self.frontier.filter();
        let mut enqueued = 0;
        for link in self.extractor.extract(url, &response) {
            if !filter.is_eligible(&link) {
                continue;
            }
            if self.frontier.enqueue(link.as_str())? {
                debug!("Enqueued {}", link);
                enqueued += 1;
            }
        }

        Ok(enqueued)
    }
}
