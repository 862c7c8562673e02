//! Crawler coordinator - crawl orchestration
//!
//! This module wires the shared components together and runs the workers:
//! - Building the filter, frontier, politeness table and analytics aggregator
//! - Recording the run and seeding the frontier
//! - Running the workers to completion
//! - Flushing the reports and closing the run

use crate::analytics::Analytics;
use crate::config::Config;
use crate::crawler::extractor::Extractor;
use crate::crawler::fetcher::{Fetch, HttpFetcher};
use crate::crawler::politeness::Politeness;
use crate::crawler::worker::{Worker, WorkerReport};
use crate::frontier::{Frontier, FrontierMode, FrontierStatistics};
use crate::storage::RunStatus;
use crate::url::UrlFilter;
use crate::CrawlerError;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Totals of a finished crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    pub run_id: i64,
    pub pages_processed: u64,
    pub links_enqueued: u64,
    pub failed_workers: usize,
    pub frontier: FrontierStatistics,
}

/// Owns the shared crawl state and runs the workers
pub struct Crawler<F: Fetch = HttpFetcher> {
    config: Arc<Config>,
    config_hash: String,
    frontier: Arc<Frontier>,
    politeness: Arc<Politeness>,
    analytics: Arc<Analytics>,
    fetcher: Arc<F>,
}

impl Crawler<HttpFetcher> {
    /// Creates a crawler that fetches over HTTP
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `config_hash` - Hash of the configuration file, recorded with the run
    /// * `mode` - Whether to discard or resume the stored frontier
    pub fn new(config: Config, config_hash: &str, mode: FrontierMode) -> Result<Self, CrawlerError> {
        let fetcher = HttpFetcher::new(&config.user_agent, &config.crawler)?;
        Self::with_fetcher(config, config_hash, mode, fetcher)
    }
}

impl<F: Fetch + 'static> Crawler<F> {
    /// Creates a crawler around any fetcher
    pub fn with_fetcher(
        config: Config,
        config_hash: &str,
        mode: FrontierMode,
        fetcher: F,
    ) -> Result<Self, CrawlerError> {
        let filter = Arc::new(UrlFilter::from_config(&config));
        let frontier = Frontier::open(Path::new(&config.output.database_path), mode, filter)?;
        let politeness = Politeness::new(Duration::from_millis(config.crawler.politeness_delay_ms));
        let analytics = Analytics::from_config(&config);

        Ok(Self {
            config: Arc::new(config),
            config_hash: config_hash.to_string(),
            frontier: Arc::new(frontier),
            politeness: Arc::new(politeness),
            analytics: Arc::new(analytics),
            fetcher: Arc::new(fetcher),
        })
    }

    /// The shared frontier
    pub fn frontier(&self) -> &Arc<Frontier> {
        &self.frontier
    }

    /// The shared analytics aggregator
    pub fn analytics(&self) -> &Arc<Analytics> {
        &self.analytics
    }

    /// Records a new run and seeds the frontier
    ///
    /// # Returns
    ///
    /// The id of the new run
    pub fn begin(&self) -> Result<i64, CrawlerError> {
        if let Some(previous) = self.frontier.latest_run()? {
            match previous.status {
                RunStatus::Running => warn!(
                    "Previous run {} (started {}) did not finish cleanly",
                    previous.id, previous.started_at
                ),
                RunStatus::Interrupted => info!(
                    "Previous run {} was interrupted, continuing its frontier",
                    previous.id
                ),
                RunStatus::Completed | RunStatus::Failed => {}
            }
        }

        let run_id = self.frontier.start_run(&self.config_hash)?;
        self.frontier.seed(&self.config.scope.seeds[..])?;
        info!("Started crawl run {}", run_id);
        Ok(run_id)
    }

    /// Runs every worker until the frontier is exhausted
    ///
    /// Worker failures, panics included, are logged and do not stop the
    /// other workers. A failed worker's URL is marked Done rather than left
    /// Reserved. The reports are flushed and the run is closed once all
    /// workers are done.
    pub async fn run(&self, run_id: i64) -> Result<CrawlSummary, CrawlerError> {
        let start_time = Instant::now();
        let worker_count = self.config.crawler.workers.max(1) as usize;
        info!("Running {} workers", worker_count);

        let results = if worker_count == 1 {
            vec![self.worker(0).run().await]
        } else {
            let handles: Vec<_> = (0..worker_count)
                .map(|id| tokio::spawn(self.worker(id).run()))
                .collect();

            let mut results = Vec::with_capacity(handles.len());
            for (id, handle) in handles.into_iter().enumerate() {
                results.push(handle.await.unwrap_or_else(|e| {
                    Err(CrawlerError::Worker {
                        id,
                        message: e.to_string(),
                    })
                }));
            }
            results
        };

        let mut summary = CrawlSummary {
            run_id,
            ..Default::default()
        };
        for result in results {
            match result {
                Ok(WorkerReport {
                    pages_processed,
                    links_enqueued,
                }) => {
                    summary.pages_processed += pages_processed;
                    summary.links_enqueued += links_enqueued;
                }
                Err(e) => {
                    error!("Worker failed: {}", e);
                    summary.failed_workers += 1;
                }
            }
        }

        if let Err(e) = self.analytics.flush() {
            warn!("Failed to write final analytics reports: {}", e);
        }

        let status = if summary.failed_workers == 0 {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        self.frontier.finish_run(run_id, status)?;
        summary.frontier = self.frontier.statistics()?;

        info!(
            "Crawl run {} finished: {} pages processed in {:?} ({} unique pages)",
            run_id,
            summary.pages_processed,
            start_time.elapsed(),
            self.analytics.unique_pages()
        );

        Ok(summary)
    }

    /// Seeds and runs a complete crawl
    pub async fn crawl(&self) -> Result<CrawlSummary, CrawlerError> {
        let run_id = self.begin()?;
        self.run(run_id).await
    }

    /// Flushes the reports and marks the run interrupted
    ///
    /// Reserved URLs stay in the frontier and are offered again on resume.
    pub fn interrupt(&self, run_id: i64) -> Result<(), CrawlerError> {
        warn!("Crawl run {} interrupted", run_id);
        if let Err(e) = self.analytics.flush() {
            warn!("Failed to write analytics reports: {}", e);
        }
        self.frontier.finish_run(run_id, RunStatus::Interrupted)?;
        Ok(())
    }

    fn worker(&self, id: usize) -> Worker<F> {
        Worker::new(
            id,
            Arc::clone(&self.frontier),
            Arc::clone(&self.politeness),
            Extractor::from_config(Arc::clone(&self.analytics), &self.config.crawler),
            Arc::clone(&self.fetcher),
            Duration::from_millis(self.config.crawler.idle_poll_ms),
        )
    }
}
