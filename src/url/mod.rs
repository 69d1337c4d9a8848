//! URL handling module for Tidewater
//!
//! This module provides link normalization, domain extraction and the
//! content-addressed fingerprint used as the frontier's dedup key.

mod domain;
mod fingerprint;
mod normalize;

// Re-export main functions
pub use domain::{canonicalize_domain, extract_domain, is_same_domain, parse_domain};
pub use fingerprint::fingerprint;
pub use normalize::{normalize_link, normalize_url};

/// Whether a discovered link stays on the source page's site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkScope {
    /// Same normalized host as the source page
    Internal,
    /// Any other host
    External,
}

/// Classifies `link` relative to the page it was found on
///
/// Two URLs are on the same site iff their normalized hosts are equal, so
/// `https://www.example.com/a` and `http://example.com/b` are internal to
/// each other while `https://blog.example.com/` is external to both.
pub fn classify_link(source: &::url::Url, link: &::url::Url) -> LinkScope {
    if is_same_domain(source, link) {
        LinkScope::Internal
    } else {
        LinkScope::External
    }
}
