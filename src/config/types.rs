use crate::url::TrapRules;
use serde::Deserialize;

/// Main configuration structure for Ripple-Scope
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub scope: ScopeConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub filter: TrapRules,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of worker tasks sharing the frontier
    pub workers: u32,

    /// Minimum time between requests to the same host (milliseconds)
    #[serde(rename = "politeness-delay-ms")]
    pub politeness_delay_ms: u64,

    /// How long an idle worker waits before asking the frontier again (milliseconds)
    #[serde(rename = "idle-poll-ms", default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Bodies larger than this are skipped without extraction
    #[serde(rename = "max-body-bytes", default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Pages with fewer words than this are treated as dead pages
    #[serde(rename = "min-page-words", default = "default_min_page_words")]
    pub min_page_words: usize,

    /// Optional caching proxy every request is routed through
    #[serde(rename = "cache-server", default)]
    pub cache_server: Option<String>,
}

/// Crawl scope configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScopeConfig {
    /// Root domains; a host is in scope if it equals one or is a subdomain of one
    #[serde(rename = "root-domains")]
    pub root_domains: Vec<String>,

    /// Domain whose subdomains are counted in the subdomain report
    #[serde(rename = "institution-domain")]
    pub institution_domain: String,

    /// URLs the frontier is seeded with
    pub seeds: Vec<String>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite frontier database
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory the four report files are written to
    #[serde(rename = "reports-dir")]
    pub reports_dir: String,

    /// Number of recorded pages between automatic report flushes
    #[serde(rename = "flush-every", default = "default_flush_every")]
    pub flush_every: u32,
}

fn default_idle_poll_ms() -> u64 {
    100
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    crate::crawler::DEFAULT_MAX_BODY_BYTES
}

fn default_min_page_words() -> usize {
    crate::crawler::DEFAULT_MIN_PAGE_WORDS
}

fn default_flush_every() -> u32 {
    crate::analytics::DEFAULT_FLUSH_EVERY
}
