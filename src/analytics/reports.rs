//! Report file rendering and atomic writes
//!
//! Four UTF-8 files are written to the reports directory on every flush:
//!
//! | File | Content |
//! |------|---------|
//! | `unique_pages.txt` | `count: <N>` |
//! | `longest_page.txt` | `url: <U>` and `word_count: <N>` |
//! | `top_50_words.txt` | up to 50 lines of `<word>, <count>` |
//! | `subdomains.txt` | `<host>, <count>` sorted by host |
//!
//! Each file is written to a temporary sibling and renamed into place, so a
//! reader never observes a half-written report.

use std::fs;
use std::io;
use std::path::Path;

pub const UNIQUE_PAGES_FILE: &str = "unique_pages.txt";
pub const LONGEST_PAGE_FILE: &str = "longest_page.txt";
pub const TOP_WORDS_FILE: &str = "top_50_words.txt";
pub const SUBDOMAINS_FILE: &str = "subdomains.txt";

/// Number of entries in the word-frequency report
pub const TOP_WORDS_LIMIT: usize = 50;

/// Point-in-time copy of everything the reports show
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSnapshot {
    pub unique_pages: usize,
    pub longest_page: Option<(String, usize)>,
    /// Highest counts first, ties in first-seen order
    pub top_words: Vec<(String, u64)>,
    /// Sorted by host
    pub subdomains: Vec<(String, u64)>,
}

pub fn render_unique_pages(snapshot: &ReportSnapshot) -> String {
    format!("count: {}\n", snapshot.unique_pages)
}

pub fn render_longest_page(snapshot: &ReportSnapshot) -> String {
    match &snapshot.longest_page {
        Some((url, count)) => format!("url: {}\nword_count: {}\n", url, count),
        None => "url: \nword_count: 0\n".to_string(),
    }
}

pub fn render_top_words(snapshot: &ReportSnapshot) -> String {
    snapshot
        .top_words
        .iter()
        .take(TOP_WORDS_LIMIT)
        .map(|(word, count)| format!("{}, {}\n", word, count))
        .collect()
}

pub fn render_subdomains(snapshot: &ReportSnapshot) -> String {
    snapshot
        .subdomains
        .iter()
        .map(|(host, count)| format!("{}, {}\n", host, count))
        .collect()
}

/// Writes all four reports into `dir`, creating it if needed
pub fn write_reports(dir: &Path, snapshot: &ReportSnapshot) -> io::Result<()> {
    fs::create_dir_all(dir)?;

    write_atomic(&dir.join(UNIQUE_PAGES_FILE), &render_unique_pages(snapshot))?;
    write_atomic(&dir.join(LONGEST_PAGE_FILE), &render_longest_page(snapshot))?;
    write_atomic(&dir.join(TOP_WORDS_FILE), &render_top_words(snapshot))?;
    write_atomic(&dir.join(SUBDOMAINS_FILE), &render_subdomains(snapshot))?;

    Ok(())
}

fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let tmp = path.with_extension("txt.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}
