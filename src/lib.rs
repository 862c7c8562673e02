//! Ripple-Scope: a polite, scope-restricted web crawler
//!
//! This crate implements a multi-worker crawler that walks a fixed set of
//! root domains from a persistent, deduplicating frontier, spaces requests
//! per host, filters crawler traps, and aggregates corpus statistics into
//! report files while the crawl runs.

pub mod analytics;
pub mod config;
pub mod crawler;
pub mod frontier;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Ripple-Scope operations
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Worker {id} failed: {message}")]
    Worker { id: usize, message: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Ripple-Scope operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

// Re-export commonly used types
pub use analytics::Analytics;
pub use config::Config;
pub use crawler::Crawler;
pub use frontier::{Frontier, FrontierMode, NextUrl};
pub use state::UrlStatus;
pub use url::{canonicalize, canonicalize_str, extract_domain, TrapRules, UrlFilter};
