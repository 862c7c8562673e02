//! Link extraction from fetched pages
//!
//! The extractor is the only place a page's content is looked at. It decides
//! whether a response is worth parsing, hands the visible text to the
//! analytics aggregator, and resolves every anchor into a canonical URL.
//! Scope and trap filtering is left to the caller.

use crate::analytics::{word_count, Analytics};
use crate::config::CrawlerConfig;
use crate::crawler::fetcher::FetchResponse;
use crate::crawler::parser::parse_html;
use crate::url::canonicalize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Content types that are parsed as HTML
const HTML_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// Turns fetched pages into outbound links and analytics records
#[derive(Debug, Clone)]
pub struct Extractor {
    analytics: Arc<Analytics>,
    max_body_bytes: usize,
    min_page_words: usize,
}

impl Extractor {
    /// Creates an extractor feeding `analytics`
    ///
    /// # Arguments
    ///
    /// * `analytics` - Aggregator every useful page is recorded with
    /// * `max_body_bytes` - Bodies larger than this are skipped
    /// * `min_page_words` - Pages with fewer words are treated as dead
    pub fn new(analytics: Arc<Analytics>, max_body_bytes: usize, min_page_words: usize) -> Self {
        Self {
            analytics,
            max_body_bytes,
            min_page_words,
        }
    }

    /// Creates an extractor using the limits in the crawler configuration
    pub fn from_config(analytics: Arc<Analytics>, config: &CrawlerConfig) -> Self {
        Self::new(analytics, config.max_body_bytes, config.min_page_words)
    }

    /// Extracts the canonical outbound links of a fetched page
    ///
    /// Links are returned in document order without duplicates. Responses
    /// that are not successful, not HTML, too large or nearly empty yield no
    /// links and are not recorded with analytics.
    ///
    /// # Arguments
    ///
    /// * `requested_url` - The URL that was fetched
    /// * `response` - What the fetcher returned for it
    pub fn extract(&self, requested_url: &str, response: &FetchResponse) -> Vec<Url> {
        if !response.is_success() {
            debug!("Skipping {}: status {}", requested_url, response.status);
            return Vec::new();
        }
        let body = response.body.as_deref().unwrap_or_default();

        if let Some(content_type) = response.content_type() {
            if !is_html(content_type) {
                debug!("Skipping {}: content type {}", requested_url, content_type);
                return Vec::new();
            }
        }

        if body.len() > self.max_body_bytes {
            debug!(
                "Skipping {}: body larger than {} bytes",
                requested_url, self.max_body_bytes
            );
            return Vec::new();
        }

        let html = String::from_utf8_lossy(body);
        let page = parse_html(&html);

        let words = word_count(&page.text);
        if words < self.min_page_words {
            debug!("Skipping {}: dead page ({} words)", requested_url, words);
            return Vec::new();
        }

        let page_url = if response.url.is_empty() {
            requested_url
        } else {
            response.url.as_str()
        };

        if let Err(e) = self.analytics.record_page(page_url, &page.text) {
            warn!("Failed to record analytics for {}: {}", page_url, e);
        }

        let base = match Url::parse(page_url).or_else(|_| Url::parse(requested_url)) {
            Ok(base) => base,
            Err(e) => {
                warn!("Cannot resolve links of {}: {}", requested_url, e);
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for href in &page.hrefs {
            match canonicalize(&base, href) {
                Ok(link) => {
                    if seen.insert(link.as_str().to_string()) {
                        links.push(link);
                    }
                }
                Err(e) => debug!("Dropping link {} on {}: {}", href, page_url, e),
            }
        }

        links
    }
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    HTML_CONTENT_TYPES.contains(&mime.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::{TrapRules, UrlFilter};
    use std::collections::HashMap;
    use tempfile::TempDir;

    const FILLER: &str = "The department of computer science offers research programs in \
        machine learning, systems, theory, networks, security and human computer \
        interaction for undergraduate and graduate students across the campus.";

    fn html_page(anchors: &str) -> String {
        format!(
            "<html><head><title>ICS</title></head><body><p>{}</p>{}</body></html>",
            FILLER, anchors
        )
    }

    fn response(url: &str, body: &str, content_type: Option<&str>) -> FetchResponse {
        let mut headers = HashMap::new();
        if let Some(content_type) = content_type {
            headers.insert("content-type".to_string(), content_type.to_string());
        }
        FetchResponse {
            status: 200,
            url: url.to_string(),
            body: Some(body.as_bytes().to_vec()),
            headers,
            error: None,
        }
    }

    fn extractor(dir: &TempDir) -> (Extractor, Arc<Analytics>) {
        let analytics = Arc::new(Analytics::new(dir.path(), "uci.edu", 50));
        (
            Extractor::new(Arc::clone(&analytics), 1024 * 1024, 20),
            analytics,
        )
    }

    #[test]
    fn test_extracts_single_in_scope_link() {
        let dir = TempDir::new().unwrap();
        let (extractor, analytics) = extractor(&dir);
        let filter = UrlFilter::new(vec!["ics.uci.edu".to_string()], TrapRules::default());

        let body = html_page(
            r#"<a href="/a">A</a><a href="/a#frag">A again</a><a href="https://offsite.com/x">X</a>"#,
        );
        let page = response("https://www.ics.uci.edu/", &body, Some("text/html; charset=utf-8"));

        let links = extractor.extract("https://www.ics.uci.edu/", &page);
        assert_eq!(links.len(), 2);

        let eligible: Vec<String> = links
            .iter()
            .filter(|link| filter.is_eligible(link))
            .map(|link| link.to_string())
            .collect();
        assert_eq!(eligible, vec!["https://www.ics.uci.edu/a".to_string()]);
        assert_eq!(analytics.unique_pages(), 1);
    }

    #[test]
    fn test_links_resolve_against_final_url() {
        let dir = TempDir::new().unwrap();
        let (extractor, analytics) = extractor(&dir);

        let body = html_page(r#"<a href="next">Next</a>"#);
        let page = response("https://www.ics.uci.edu/dir/", &body, None);

        let links = extractor.extract("https://www.ics.uci.edu/old", &page);
        assert_eq!(links[0].as_str(), "https://www.ics.uci.edu/dir/next");
        assert_eq!(
            analytics.snapshot().longest_page.map(|(url, _)| url),
            Some("https://www.ics.uci.edu/dir/".to_string())
        );
    }

    #[test]
    fn test_non_success_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let (extractor, analytics) = extractor(&dir);

        let mut page = response("https://www.ics.uci.edu/", &html_page(r#"<a href="/a">A</a>"#), None);
        page.status = 404;
        assert!(extractor.extract("https://www.ics.uci.edu/", &page).is_empty());

        let failed = FetchResponse::failed("https://www.ics.uci.edu/", "timeout");
        assert!(extractor.extract("https://www.ics.uci.edu/", &failed).is_empty());

        assert_eq!(analytics.unique_pages(), 0);
    }

    #[test]
    fn test_non_html_content_type_skipped() {
        let dir = TempDir::new().unwrap();
        let (extractor, analytics) = extractor(&dir);

        let page = response(
            "https://www.ics.uci.edu/data",
            &html_page(r#"<a href="/a">A</a>"#),
            Some("application/json"),
        );
        assert!(extractor.extract("https://www.ics.uci.edu/data", &page).is_empty());
        assert_eq!(analytics.unique_pages(), 0);

        let xhtml = response(
            "https://www.ics.uci.edu/x",
            &html_page(r#"<a href="/a">A</a>"#),
            Some("Application/XHTML+XML"),
        );
        assert_eq!(extractor.extract("https://www.ics.uci.edu/x", &xhtml).len(), 1);
    }

    #[test]
    fn test_oversized_body_skipped() {
        let dir = TempDir::new().unwrap();
        let analytics = Arc::new(Analytics::new(dir.path(), "uci.edu", 50));
        let extractor = Extractor::new(Arc::clone(&analytics), 64, 20);

        let page = response("https://www.ics.uci.edu/", &html_page(r#"<a href="/a">A</a>"#), None);
        assert!(extractor.extract("https://www.ics.uci.edu/", &page).is_empty());
        assert_eq!(analytics.unique_pages(), 0);
    }

    #[test]
    fn test_dead_page_skipped() {
        let dir = TempDir::new().unwrap();
        let (extractor, analytics) = extractor(&dir);

        let page = response(
            "https://www.ics.uci.edu/",
            r#"<html><body><p>Nothing here</p><a href="/a">A</a><script>var a = 1; var b = 2;</script></body></html>"#,
            Some("text/html"),
        );
        assert!(extractor.extract("https://www.ics.uci.edu/", &page).is_empty());
        assert_eq!(analytics.unique_pages(), 0);
    }

    #[test]
    fn test_report_write_failure_keeps_links() {
        let dir = TempDir::new().unwrap();
        // A regular file where the reports directory should go
        let blocked = dir.path().join("reports");
        std::fs::write(&blocked, "not a directory").unwrap();
        let analytics = Arc::new(Analytics::new(blocked.clone(), "uci.edu", 1));
        let extractor = Extractor::new(Arc::clone(&analytics), 1024 * 1024, 20);

        let page = response(
            "https://www.ics.uci.edu/",
            &html_page(r#"<a href="/a">A</a>"#),
            Some("text/html"),
        );
        let links = extractor.extract("https://www.ics.uci.edu/", &page);

        assert_eq!(links.len(), 1);
        assert_eq!(analytics.unique_pages(), 1);
        assert!(analytics.flush().is_err());
    }

    #[test]
    fn test_malformed_hrefs_dropped() {
        let dir = TempDir::new().unwrap();
        let (extractor, _) = extractor(&dir);

        let page = response(
            "https://www.ics.uci.edu/",
            &html_page(r#"<a href="mailto:x@uci.edu">M</a><a href="javascript:void(0)">J</a><a href="/ok">OK</a>"#),
            Some("text/html"),
        );
        let links = extractor.extract("https://www.ics.uci.edu/", &page);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "https://www.ics.uci.edu/ok");
    }
}
