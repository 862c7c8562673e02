//! URL handling module for Ripple-Scope
//!
//! This module provides URL canonicalization, host extraction, scope
//! matching against root domains, and the trap filter that decides which
//! canonical URLs may enter the frontier.

mod canonicalize;
mod domain;
mod filter;

// Re-export main functions
pub use canonicalize::{canonicalize, canonicalize_str};
pub use domain::{extract_domain, is_in_scope, matches_root};
pub use filter::{TrapRules, UrlFilter};
