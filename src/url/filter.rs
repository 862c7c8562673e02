//! Scope and crawler-trap filtering
//!
//! Decides whether a canonical URL may enter the frontier. The rule set is
//! plain data ([`TrapRules`]) so it can be tuned from the `[filter]` section
//! of the configuration without touching code. Evaluation never fails:
//! anything that cannot be parsed is ineligible.

use crate::config::Config;
use crate::url::domain::is_in_scope;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::debug;
use url::{form_urlencoded, Url};

static RE_YEAR_SEGMENT: OnceLock<Option<Regex>> = OnceLock::new();
static RE_DATE_SEGMENT: OnceLock<Option<Regex>> = OnceLock::new();

/// Matches `19xx`/`20xx`, optionally followed by `-MM` and `-DD`
fn year_segment_regex() -> Option<&'static Regex> {
    RE_YEAR_SEGMENT
        .get_or_init(|| Regex::new(r"^(19|20)\d{2}(-\d{2}(-\d{2})?)?$").ok())
        .as_ref()
}

fn date_segment_regex() -> Option<&'static Regex> {
    RE_DATE_SEGMENT
        .get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").ok())
        .as_ref()
}

/// Configurable rule set for scope and trap filtering
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TrapRules {
    /// Longest accepted URL, in bytes
    pub max_url_length: usize,

    /// Longest accepted query string, in bytes
    pub max_query_length: usize,

    /// Most query pairs accepted
    pub max_query_params: usize,

    /// A path segment may occur at most this many times
    pub max_segment_repeats: usize,

    /// Most path segments accepted
    pub max_path_segments: usize,

    /// Number of back-to-back repetitions of a segment block that marks a loop
    pub repeated_block_limit: usize,

    /// Paths containing a digit run at least this long are rejected
    pub max_digit_run: usize,

    /// Pagination values with at least this many digits are rejected
    pub min_pagination_digits: usize,

    /// Non-HTML file extensions, without the dot
    pub denied_extensions: Vec<String>,

    /// Substrings that mark low-value or looping endpoints in path or query
    pub trap_substrings: Vec<String>,

    /// Path keywords that turn a year-like segment into a calendar trap
    pub calendar_keywords: Vec<String>,

    /// Query keys treated as pagination offsets
    pub pagination_params: Vec<String>,
}

impl Default for TrapRules {
    fn default() -> Self {
        Self {
            max_url_length: 2000,
            max_query_length: 300,
            max_query_params: 12,
            max_segment_repeats: 3,
            max_path_segments: 30,
            repeated_block_limit: 3,
            max_digit_run: 6,
            min_pagination_digits: 3,
            denied_extensions: to_strings(&[
                "css", "js", "bmp", "gif", "jpg", "jpeg", "ico", "png", "tif", "tiff", "mid",
                "mp2", "mp3", "mp4", "wav", "avi", "mov", "mpeg", "ram", "m4v", "mkv", "ogg",
                "ogv", "pdf", "ps", "eps", "tex", "ppt", "pptx", "doc", "docx", "xls", "xlsx",
                "names", "data", "dat", "exe", "bz2", "tar", "msi", "bin", "7z", "psd", "dmg",
                "iso", "epub", "dll", "cnf", "tgz", "sha1", "thmx", "mso", "arff", "rtf", "jar",
                "csv", "rm", "smil", "wmv", "swf", "wma", "zip", "rar", "gz", "svg", "ics",
                "m3u8",
            ]),
            trap_substrings: to_strings(&[
                "calendar",
                "/ical",
                "ical=",
                "/feed/",
                "feed=",
                "wp-json",
                "wp-admin",
                "wp-login",
                "replytocom",
                "sessionid",
                "session_id",
                "phpsessid",
                "jsessionid",
                "/author/",
                "/tag/",
                "/tags/",
                "/print/",
                "print=",
                "/share/",
                "share=",
                "/login",
                "/logout",
                "/redirect",
                "redirect=",
                "action=",
                "format=xml",
                "sort=",
                "filter=",
                "do=",
                "c=n;o=",
                "c=m;o=",
                "c=s;o=",
                "c=d;o=",
            ]),
            calendar_keywords: to_strings(&["calendar", "event", "archive"]),
            pagination_params: to_strings(&["page", "paged", "offset", "start", "p"]),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Scope and trap predicate over canonical URLs
#[derive(Debug, Clone)]
pub struct UrlFilter {
    root_domains: Vec<String>,
    rules: TrapRules,
}

impl UrlFilter {
    /// Creates a filter for the given root domains and rule set
    pub fn new(root_domains: Vec<String>, rules: TrapRules) -> Self {
        let root_domains = root_domains
            .into_iter()
            .map(|d| d.trim().to_lowercase())
            .collect();
        Self {
            root_domains,
            rules,
        }
    }

    /// Builds the filter described by a loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.scope.root_domains.clone(), config.filter.clone())
    }

    /// Returns true if the URL may be crawled
    pub fn is_eligible(&self, url: &Url) -> bool {
        match self.rejection_reason(url) {
            Some(reason) => {
                debug!("Rejected {}: {}", url, reason);
                false
            }
            None => true,
        }
    }

    /// Parses and checks a URL string; unparsable input is ineligible
    pub fn is_eligible_str(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => self.is_eligible(&parsed),
            Err(_) => false,
        }
    }

    /// Returns the first rule the URL violates, if any
    pub fn rejection_reason(&self, url: &Url) -> Option<&'static str> {
        let rules = &self.rules;
        let query = url.query().unwrap_or("");

        if url.as_str().len() > rules.max_url_length {
            return Some("url too long");
        }
        if query.len() > rules.max_query_length {
            return Some("query too long");
        }
        if url.scheme() != "http" && url.scheme() != "https" {
            return Some("scheme");
        }

        let host = match url.host_str() {
            Some(host) => host.to_lowercase(),
            None => return Some("no host"),
        };
        if !is_in_scope(&host, &self.root_domains) {
            return Some("out of scope");
        }

        if query.split('&').filter(|p| !p.is_empty()).count() > rules.max_query_params {
            return Some("too many query parameters");
        }

        let path = url.path().to_lowercase();
        let lower_query = query.to_lowercase();

        if self.has_denied_extension(&path) {
            return Some("non-html extension");
        }

        if rules
            .trap_substrings
            .iter()
            .map(|s| s.to_lowercase())
            .any(|s| path.contains(&s) || lower_query.contains(&s))
        {
            return Some("trap substring");
        }

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() > rules.max_path_segments {
            return Some("too many path segments");
        }
        if has_overused_segment(&segments, rules.max_segment_repeats) {
            return Some("repeated path segment");
        }
        if has_repeated_block(&segments, rules.repeated_block_limit) {
            return Some("repeated path block");
        }

        if longest_digit_run(&path) >= rules.max_digit_run {
            return Some("long digit run");
        }

        if self.is_calendar_trap(&path, &segments) {
            return Some("calendar trap");
        }
        if self.is_pagination_trap(query) {
            return Some("pagination trap");
        }

        None
    }

    fn has_denied_extension(&self, path: &str) -> bool {
        match path.rsplit_once('.') {
            Some((_, ext)) => self
                .rules
                .denied_extensions
                .iter()
                .any(|denied| denied.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }

    fn is_calendar_trap(&self, path: &str, segments: &[&str]) -> bool {
        let (year_re, date_re) = match (year_segment_regex(), date_segment_regex()) {
            (Some(year_re), Some(date_re)) => (year_re, date_re),
            // Fail closed
            _ => return true,
        };

        let has_keyword = self
            .rules
            .calendar_keywords
            .iter()
            .any(|k| path.contains(&k.to_lowercase()));

        if has_keyword && segments.iter().any(|s| year_re.is_match(s)) {
            return true;
        }

        let under_events = path.contains("event") || path.contains("calendar");
        under_events && segments.iter().any(|s| date_re.is_match(s))
    }

    fn is_pagination_trap(&self, query: &str) -> bool {
        form_urlencoded::parse(query.as_bytes()).any(|(key, value)| {
            let key = key.to_lowercase();
            self.rules.pagination_params.iter().any(|p| *p == key)
                && value.len() >= self.rules.min_pagination_digits
                && value.chars().all(|c| c.is_ascii_digit())
        })
    }
}

fn has_overused_segment(segments: &[&str], max_repeats: usize) -> bool {
    segments
        .iter()
        .any(|seg| segments.iter().filter(|other| *other == seg).count() > max_repeats)
}

/// Detects a block of one or more segments repeated back-to-back `limit` times
fn has_repeated_block(segments: &[&str], limit: usize) -> bool {
    if limit < 2 {
        return false;
    }
    let n = segments.len();
    for block in 1..=n / limit {
        for start in 0..=n - block * limit {
            let first = &segments[start..start + block];
            if (1..limit).all(|k| {
                let offset = start + k * block;
                &segments[offset..offset + block] == first
            }) {
                return true;
            }
        }
    }
    false
}

fn longest_digit_run(path: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in path.chars() {
        if c.is_ascii_digit() {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> UrlFilter {
        UrlFilter::new(
            vec![
                "ics.uci.edu".to_string(),
                "cs.uci.edu".to_string(),
                "informatics.uci.edu".to_string(),
                "stat.uci.edu".to_string(),
            ],
            TrapRules::default(),
        )
    }

    fn eligible(url: &str) -> bool {
        filter().is_eligible_str(url)
    }

    #[test]
    fn test_ordinary_pages_accepted() {
        assert!(eligible("https://www.ics.uci.edu/"));
        assert!(eligible("https://www.ics.uci.edu/about/people/index.php"));
        assert!(eligible("https://vision.ics.uci.edu/papers.html"));
        assert!(eligible("http://www.stat.uci.edu/news/2023/"));
        assert!(eligible("https://ics.uci.edu/search?q=rust&page=2"));
    }

    #[test]
    fn test_out_of_scope_rejected() {
        assert!(!eligible("https://www.uci.edu/"));
        assert!(!eligible("https://physics.uci.edu/"));
        assert!(!eligible("https://example.com/ics.uci.edu"));
    }

    #[test]
    fn test_unparsable_is_ineligible() {
        assert!(!eligible("not a url"));
        assert!(!eligible(""));
        assert!(!eligible("ftp://ics.uci.edu/file.txt"));
    }

    #[test]
    fn test_length_limits() {
        let long_path = "a".repeat(2001);
        assert!(!eligible(&format!("https://ics.uci.edu/{}", long_path)));

        let long_query = "x".repeat(301);
        assert!(!eligible(&format!("https://ics.uci.edu/p?q={}", long_query)));
    }

    #[test]
    fn test_too_many_query_params() {
        let twelve: Vec<String> = (0..12).map(|i| format!("k{}=v", i)).collect();
        assert!(eligible(&format!("https://ics.uci.edu/p?{}", twelve.join("&"))));

        let thirteen: Vec<String> = (0..13).map(|i| format!("k{}=v", i)).collect();
        assert!(!eligible(&format!("https://ics.uci.edu/p?{}", thirteen.join("&"))));
    }

    #[test]
    fn test_denied_extensions() {
        assert!(!eligible("https://ics.uci.edu/files/paper.pdf"));
        assert!(!eligible("https://ics.uci.edu/img/logo.PNG"));
        assert!(!eligible("https://ics.uci.edu/data/set.zip"));
        assert!(eligible("https://ics.uci.edu/page.html"));
        assert!(eligible("https://ics.uci.edu/page.php"));
    }

    #[test]
    fn test_trap_substrings() {
        assert!(!eligible("https://ics.uci.edu/wp-json/wp/v2/posts"));
        assert!(!eligible("https://ics.uci.edu/post/?replytocom=12"));
        assert!(!eligible("https://ics.uci.edu/blog/feed/"));
        assert!(!eligible("https://ics.uci.edu/wiki/doku.php?do=edit"));
        assert!(!eligible("https://ics.uci.edu/~user/pix/?C=N;O=D"));
        assert!(!eligible("https://ics.uci.edu/list?action=login"));
        assert!(!eligible("https://ics.uci.edu/author/someone/"));
    }

    #[test]
    fn test_ical_only_matches_as_token() {
        assert!(!eligible("https://ics.uci.edu/events/ical/"));
        assert!(!eligible("https://ics.uci.edu/events/?ical=1"));
        assert!(eligible("https://www.stat.uci.edu/statistical-consulting/"));
        assert!(eligible("https://ics.uci.edu/technical-reports/"));
        assert!(eligible("https://ics.uci.edu/physical/"));
    }

    #[test]
    fn test_segment_repeated_four_times_rejected() {
        assert!(!eligible("https://ics.uci.edu/a/b/a/c/a/d/a"));
    }

    #[test]
    fn test_segment_repeated_three_times_accepted() {
        assert!(eligible("https://ics.uci.edu/a/b/a/c/a"));
    }

    #[test]
    fn test_back_to_back_blocks_rejected() {
        assert!(!eligible("https://ics.uci.edu/a/a/a/"));
        assert!(!eligible("https://ics.uci.edu/x/y/x/y/x/y"));
        assert!(eligible("https://ics.uci.edu/x/y/x/y"));
    }

    #[test]
    fn test_too_many_segments() {
        let path: Vec<String> = (0..31).map(|i| format!("s{}", i)).collect();
        assert!(!eligible(&format!("https://ics.uci.edu/{}", path.join("/"))));
    }

    #[test]
    fn test_digit_run() {
        assert!(!eligible("https://ics.uci.edu/node/1234567"));
        assert!(eligible("https://ics.uci.edu/node/12345"));
    }

    #[test]
    fn test_calendar_traps() {
        assert!(!eligible("https://ics.uci.edu/events/calendar/2024-05-01/"));
        assert!(!eligible("https://ics.uci.edu/events/2024-05-01/"));
        assert!(!eligible("https://ics.uci.edu/archive/2019/"));
        assert!(!eligible("https://ics.uci.edu/events/list/2021-03"));
        assert!(eligible("https://ics.uci.edu/news/2021/"));
    }

    #[test]
    fn test_pagination_trap() {
        assert!(!eligible("https://ics.uci.edu/news?page=120"));
        assert!(!eligible("https://ics.uci.edu/list?offset=500"));
        assert!(eligible("https://ics.uci.edu/news?page=12"));
        assert!(eligible("https://ics.uci.edu/news?page=abc"));
    }

    #[test]
    fn test_custom_rules() {
        let rules = TrapRules {
            trap_substrings: vec!["private".to_string()],
            ..TrapRules::default()
        };
        let filter = UrlFilter::new(vec!["ics.uci.edu".to_string()], rules);
        assert!(!filter.is_eligible_str("https://ics.uci.edu/private/notes"));
        // Default substrings no longer apply
        assert!(filter.is_eligible_str("https://ics.uci.edu/blog/feed/"));
    }

    #[test]
    fn test_rejection_reason() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(filter().rejection_reason(&url), Some("out of scope"));
    }
}
