//! URL canonicalization
//!
//! Resolves raw links against their page and normalizes them into the form
//! the frontier deduplicates on.

use crate::UrlError;
use url::form_urlencoded;
use url::Url;

/// Query keys that carry tracking, session or sharing state rather than content
const BLACKLISTED_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "dclid",
    "msclkid",
    "mc_cid",
    "mc_eid",
    "_ga",
    "_gl",
    "yclid",
    "igshid",
    "sessionid",
    "session_id",
    "sid",
    "phpsessid",
    "jsessionid",
    "share",
    "ref_src",
];

/// Canonicalizes a link found on a page
///
/// # Canonicalization Steps
///
/// 1. Resolve `href` against `base`; reject anything that is not HTTP(S)
/// 2. Drop the fragment
/// 3. Drop query pairs whose key is a tracking/session/sharing parameter,
///    keeping the remaining pairs verbatim and in their original order
/// 4. Collapse consecutive slashes in the path
/// 5. Lowercase the host and drop user info
///
/// Non-default ports are kept. The result is stable: canonicalizing a
/// canonical URL returns it unchanged.
///
/// # Arguments
///
/// * `base` - URL of the page the link was found on
/// * `href` - Raw `href` attribute value
///
/// # Returns
///
/// * `Ok(Url)` - Canonical absolute URL
/// * `Err(UrlError)` - The link cannot be resolved or is not HTTP(S)
///
/// # Examples
///
/// ```
/// use url::Url;
/// use ripple_scope::url::canonicalize;
///
/// let base = Url::parse("https://www.ics.uci.edu/about/").unwrap();
/// let url = canonicalize(&base, "../people?utm_source=x#top").unwrap();
/// assert_eq!(url.as_str(), "https://www.ics.uci.edu/people");
/// ```
pub fn canonicalize(base: &Url, href: &str) -> Result<Url, UrlError> {
    let joined = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;
    finish(joined)
}

/// Canonicalizes an already absolute URL string
///
/// Used for seeds and for every URL entering the frontier.
pub fn canonicalize_str(raw: &str) -> Result<Url, UrlError> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;
    finish(url)
}

fn finish(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_lowercase(),
        _ => return Err(UrlError::MissingDomain),
    };
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    url.set_username("")
        .map_err(|_| UrlError::Malformed("cannot clear username".to_string()))?;
    url.set_password(None)
        .map_err(|_| UrlError::Malformed("cannot clear password".to_string()))?;

    url.set_fragment(None);

    let path = collapse_slashes(url.path());
    url.set_path(&path);

    if let Some(query) = url.query() {
        let kept = filter_query(query);
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&kept));
        }
    }

    Ok(url)
}

/// Replaces every run of `/` with a single `/`
fn collapse_slashes(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' {
            if !previous_slash {
                collapsed.push(c);
            }
            previous_slash = true;
        } else {
            collapsed.push(c);
            previous_slash = false;
        }
    }
    if collapsed.is_empty() {
        collapsed.push('/');
    }
    collapsed
}

/// Keeps the raw text of every pair whose key is not blacklisted
fn filter_query(query: &str) -> String {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| !is_blacklisted_pair(pair))
        .collect::<Vec<_>>()
        .join("&")
}

fn is_blacklisted_pair(pair: &str) -> bool {
    let key = match form_urlencoded::parse(pair.as_bytes()).next() {
        Some((key, _)) => key.to_lowercase(),
        None => return false,
    };
    key.starts_with("utm_") || BLACKLISTED_PARAMS.contains(&key.as_str())
}
