use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Arguments
///
/// * `url` - The URL to extract the host from
///
/// # Returns
///
/// * `Some(String)` - The lowercase host
/// * `None` - If the URL has no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use ripple_scope::url::extract_domain;
///
/// let url = Url::parse("https://VISION.ics.uci.edu:8443/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("vision.ics.uci.edu".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if `host` equals `root` or is a subdomain of it
///
/// Matching is on label boundaries, so `evilics.uci.edu` is not under
/// `ics.uci.edu`.
///
/// # Examples
///
/// ```
/// use ripple_scope::url::matches_root;
///
/// assert!(matches_root("ics.uci.edu", "ics.uci.edu"));
/// assert!(matches_root("ics.uci.edu", "vision.ics.uci.edu"));
/// assert!(!matches_root("ics.uci.edu", "physics.uci.edu"));
/// ```
pub fn matches_root(root: &str, host: &str) -> bool {
    let host = host.trim_end_matches('.');
    match host.len().checked_sub(root.len()) {
        Some(0) => host.eq_ignore_ascii_case(root),
        Some(start) => {
            host.as_bytes()[start - 1] == b'.'
                && host
                    .get(start..)
                    .map_or(false, |suffix| suffix.eq_ignore_ascii_case(root))
        }
        None => false,
    }
}

/// Returns true if `host` falls under any of the given root domains
pub fn is_in_scope<S: AsRef<str>>(host: &str, roots: &[S]) -> bool {
    roots.iter().any(|root| matches_root(root.as_ref(), host))
}
