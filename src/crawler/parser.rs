//! HTML parser for extracting links and visible text
//!
//! This module handles parsing HTML content to extract:
//! - Raw `href` values of every `<a href>` element, in document order
//! - The visible text of the page (script, style, noscript and template
//!   contents excluded)

use scraper::{Html, Node, Selector};

/// Elements whose text content is never rendered
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// Raw href attribute values, unresolved
    pub hrefs: Vec<String>,

    /// Visible text, whitespace-separated
    pub text: String,
}

/// Parses HTML content and extracts links and visible text
///
/// Parsing is lenient: malformed markup still yields whatever the HTML5
/// parser recovers.
///
/// # Arguments
///
/// * `html` - The HTML content to parse
///
/// # Example
///
/// ```
/// use ripple_scope::crawler::parse_html;
///
/// let html = r#"<html><head><title>Test</title><script>var x;</script></head>
///     <body><a href="/page">Link</a></body></html>"#;
/// let parsed = parse_html(html);
/// assert_eq!(parsed.hrefs, vec!["/page".to_string()]);
/// assert!(!parsed.text.contains("var x"));
/// ```
pub fn parse_html(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        hrefs: extract_hrefs(&document),
        text: extract_visible_text(&document),
    }
}

/// Extracts every non-empty `href` of an `<a>` element
fn extract_hrefs(document: &Html) -> Vec<String> {
    let a_selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    document
        .select(&a_selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collects text nodes that are not inside an invisible element
fn extract_visible_text(document: &Html) -> String {
    let mut pieces: Vec<&str> = Vec::new();

    for node in document.root_element().descendants() {
        let text = match node.value() {
            Node::Text(text) => &**text,
            _ => continue,
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |element| INVISIBLE_ELEMENTS.contains(&element.name()))
        });

        let trimmed = text.trim();
        if !hidden && !trimmed.is_empty() {
            pieces.push(trimmed);
        }
    }

    pieces.join(" ")
}
