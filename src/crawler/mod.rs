//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the [`Fetch`] trait
//! - HTML parsing and link extraction
//! - Per-host politeness scheduling
//! - The worker loop and overall crawl coordination

mod coordinator;
mod extractor;
mod fetcher;
mod parser;
mod politeness;
mod worker;

pub use coordinator::{CrawlSummary, Crawler};
pub use extractor::Extractor;
pub use fetcher::{build_http_client, build_user_agent, Fetch, FetchResponse, HttpFetcher};
pub use parser::{parse_html, ParsedPage};
pub use politeness::Politeness;
pub use worker::{Worker, WorkerReport};

/// Default ceiling on response bodies that are parsed (2.5 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 2_621_440;

/// Default minimum number of words for a page to be worth recording
pub const DEFAULT_MIN_PAGE_WORDS: usize = 20;
