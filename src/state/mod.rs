//! State module for URL and domain lifecycles
//!
//! # Components
//!
//! - `UrlStatus`: the four-state crawl lifecycle of a URL record
//! - `DomainStatus`: whether a registered domain is active

mod domain_status;
mod url_status;

// Re-export main types
pub use domain_status::DomainStatus;
pub use url_status::UrlStatus;
