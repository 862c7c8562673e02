//! Corpus analytics gathered while the crawl runs
//!
//! Workers hand every successfully fetched page to a shared [`Analytics`]
//! aggregator. It tracks unique pages, the longest page, word frequencies
//! and per-subdomain page counts, and periodically writes them to four
//! report files.

mod aggregator;
mod reports;
mod stopwords;
mod tokenize;

pub use aggregator::Analytics;
pub use reports::{
    write_reports, ReportSnapshot, LONGEST_PAGE_FILE, SUBDOMAINS_FILE, TOP_WORDS_FILE,
    TOP_WORDS_LIMIT, UNIQUE_PAGES_FILE,
};
pub use stopwords::{is_stop_word, STOP_WORDS};
pub use tokenize::{frequency_words, word_count, words};

use thiserror::Error;

/// Pages recorded between automatic report flushes
pub const DEFAULT_FLUSH_EVERY: u32 = 50;

/// Analytics-specific errors
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Failed to write reports: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid page URL: {0}")]
    InvalidUrl(String),
}
