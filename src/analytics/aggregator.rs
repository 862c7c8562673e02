//! Thread-safe corpus statistics
//!
//! All counters live behind one mutex and are updated in a single critical
//! section per page. Report writing is serialized by a second lock that is
//! taken before the snapshot, so a flush can never overwrite the files with
//! an older snapshot than the previous flush wrote.

use crate::analytics::reports::{write_reports, ReportSnapshot, TOP_WORDS_LIMIT};
use crate::analytics::tokenize::{frequency_words, word_count};
use crate::analytics::AnalyticsError;
use crate::config::Config;
use crate::url::matches_root;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone, Copy)]
struct WordEntry {
    count: u64,
    first_seen: u64,
}

#[derive(Debug, Default)]
struct AnalyticsState {
    unique_urls: HashSet<String>,
    word_counts: HashMap<String, WordEntry>,
    next_sequence: u64,
    longest_page: Option<(String, usize)>,
    subdomain_counts: BTreeMap<String, u64>,
    pages_since_flush: u32,
}

impl AnalyticsState {
    fn snapshot(&self) -> ReportSnapshot {
        let mut ranked: Vec<(&String, &WordEntry)> = self.word_counts.iter().collect();
        ranked.sort_unstable_by(|a, b| {
            b.1.count
                .cmp(&a.1.count)
                .then(a.1.first_seen.cmp(&b.1.first_seen))
        });

        ReportSnapshot {
            unique_pages: self.unique_urls.len(),
            longest_page: self.longest_page.clone(),
            top_words: ranked
                .into_iter()
                .take(TOP_WORDS_LIMIT)
                .map(|(word, entry)| (word.clone(), entry.count))
                .collect(),
            subdomains: self
                .subdomain_counts
                .iter()
                .map(|(host, count)| (host.clone(), *count))
                .collect(),
        }
    }
}

/// Shared accumulator of corpus statistics
#[derive(Debug)]
pub struct Analytics {
    state: Mutex<AnalyticsState>,
    writer: Mutex<()>,
    reports_dir: PathBuf,
    institution_domain: String,
    flush_every: u32,
}

impl Analytics {
    /// Creates an empty aggregator
    ///
    /// # Arguments
    ///
    /// * `reports_dir` - Directory the report files are written to
    /// * `institution_domain` - Hosts under this domain are counted in the subdomain report
    /// * `flush_every` - Pages recorded between automatic flushes
    pub fn new(reports_dir: impl Into<PathBuf>, institution_domain: &str, flush_every: u32) -> Self {
        Self {
            state: Mutex::new(AnalyticsState::default()),
            writer: Mutex::new(()),
            reports_dir: reports_dir.into(),
            institution_domain: institution_domain.to_lowercase(),
            flush_every: flush_every.max(1),
        }
    }

    /// Creates an aggregator from the output and scope sections of `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.output.reports_dir,
            &config.scope.institution_domain,
            config.output.flush_every,
        )
    }

    // Counters stay consistent under a poisoned lock: every update is applied whole
    fn state(&self) -> MutexGuard<'_, AnalyticsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records one fetched page
    ///
    /// A URL seen before (ignoring its fragment) does not count as a new
    /// unique page, but its words still feed the frequency table and the
    /// longest-page tracker. Every `flush_every` calls the reports are
    /// written before this returns.
    ///
    /// # Arguments
    ///
    /// * `url` - URL of the page (the final URL after redirects)
    /// * `text` - Visible text of the page
    pub fn record_page(&self, url: &str, text: &str) -> Result<(), AnalyticsError> {
        let mut parsed =
            Url::parse(url).map_err(|e| AnalyticsError::InvalidUrl(format!("{}: {}", url, e)))?;
        parsed.set_fragment(None);
        let host = parsed.host_str().map(|h| h.to_lowercase());
        let key = String::from(parsed);

        let page_words = word_count(text);
        let frequency = frequency_words(text);

        let should_flush = {
            let mut guard = self.state();
            let state = &mut *guard;

            if state.unique_urls.insert(key.clone()) {
                if let Some(host) = host.filter(|h| matches_root(&self.institution_domain, h)) {
                    *state.subdomain_counts.entry(host).or_insert(0) += 1;
                }
            }

            for word in frequency {
                let sequence = state.next_sequence;
                let entry = state.word_counts.entry(word).or_insert(WordEntry {
                    count: 0,
                    first_seen: sequence,
                });
                if entry.count == 0 {
                    state.next_sequence += 1;
                }
                entry.count += 1;
            }

            let improves = match &state.longest_page {
                Some((_, best)) => page_words > *best,
                None => page_words > 0,
            };
            if improves {
                state.longest_page = Some((key.clone(), page_words));
            }

            state.pages_since_flush += 1;
            if state.pages_since_flush >= self.flush_every {
                state.pages_since_flush = 0;
                true
            } else {
                false
            }
        };

        debug!("Recorded {} ({} words)", key, page_words);

        if should_flush {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes all four reports now
    pub fn flush(&self) -> Result<(), AnalyticsError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = self.state().snapshot();

        write_reports(&self.reports_dir, &snapshot)?;
        info!(
            "Wrote analytics reports to {} ({} unique pages)",
            self.reports_dir.display(),
            snapshot.unique_pages
        );
        Ok(())
    }

    /// Current statistics, as they would be written by a flush
    pub fn snapshot(&self) -> ReportSnapshot {
        self.state().snapshot()
    }

    /// Number of distinct fragment-stripped URLs recorded
    pub fn unique_pages(&self) -> usize {
        self.state().unique_urls.len()
    }

    /// Frequency of a single word
    pub fn word_frequency(&self, word: &str) -> u64 {
        self.state()
            .word_counts
            .get(word)
            .map_or(0, |entry| entry.count)
    }
}
