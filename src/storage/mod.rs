//! Storage module for the crawl frontier
//!
//! This module handles all database operations for the frontier, including:
//! - SQLite database initialization and schema management
//! - Domain registry persistence
//! - URL record insertion, claiming and finalization
//! - Aggregate counts for statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::{DomainStatus, UrlStatus};
use crate::url::{extract_domain, fingerprint};
use crate::CrawlError;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
/// * `busy_timeout` - How long a connection waits on another writer's lock
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(CrawlError)` - Failed to initialize storage
pub fn open_storage(path: &Path, busy_timeout: Duration) -> Result<SqliteStorage, CrawlError> {
    SqliteStorage::new(path, busy_timeout)
}

/// Formats a timestamp the way every time column is stored
///
/// Fixed precision and a `Z` suffix keep the text ordering identical to the
/// chronological ordering, which the eligibility comparisons rely on.
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Represents a registered domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRecord {
    pub id: i64,
    pub normalized_domain: String,
    pub status: DomainStatus,
    pub notes: Option<String>,
    pub first_seen: String,
    pub last_seen: String,
}

impl DomainRecord {
    /// The URL every active domain is seeded with
    pub fn homepage(&self) -> String {
        format!("https://{}/", self.normalized_domain)
    }
}

/// Represents a URL record in the database
#[derive(Debug, Clone)]
pub struct UrlRecord {
    pub id: i64,
    pub fingerprint: String,
    pub normalized_url: String,
    pub domain_id: Option<i64>,
    pub normalized_domain: Option<String>,
    pub status: UrlStatus,
    pub locked_by: Option<String>,
    pub locked_at: Option<String>,
    pub last_crawled: Option<String>,
    pub discovered_at: String,
    pub http_status: Option<u16>,
    pub final_url: Option<String>,
    pub redirect_chain: Vec<RedirectHop>,
    pub emails: Vec<String>,
    pub organizations: Vec<String>,
    pub persons: Vec<String>,
    pub content: Option<String>,
    pub error_message: Option<String>,
}

/// Identity fields of a URL record about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUrl {
    pub normalized_url: String,
    pub fingerprint: String,
    pub domain_id: Option<i64>,
    pub normalized_domain: Option<String>,
}

impl NewUrl {
    /// Builds the identity of an already normalized URL
    pub fn from_url(url: &Url, domain_id: Option<i64>) -> Self {
        let normalized_url = url.to_string();
        Self {
            fingerprint: fingerprint(&normalized_url),
            normalized_domain: extract_domain(url),
            normalized_url,
            domain_id,
        }
    }
}

/// One redirect response seen while fetching a URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectHop {
    pub url: String,
    pub status: u16,
}

/// Everything recorded about a successful crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlResults {
    pub http_status: u16,
    pub final_url: String,
    pub redirect_chain: Vec<RedirectHop>,
    pub emails: Vec<String>,
    pub organizations: Vec<String>,
    pub persons: Vec<String>,
    pub content: Option<String>,
}

/// A record reserved for one worker by the claim protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedUrl {
    pub id: i64,
    pub url: String,
    pub domain_id: Option<i64>,
    pub locked_by: String,
}
