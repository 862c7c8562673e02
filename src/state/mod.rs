//! State module for tracking crawl progress
//!
//! Every URL in the frontier carries a [`UrlStatus`]: it is Pending until a
//! worker reserves it, Reserved while that worker fetches and extracts it,
//! and Done afterwards.

mod url_status;

// Re-export main types
pub use url_status::UrlStatus;
