//! Storage traits and error types
//!
//! This module defines the trait interface for frontier storage backends and
//! associated error types.

use crate::state::{DomainStatus, UrlStatus};
use crate::storage::{ClaimedUrl, CrawlResults, DomainRecord, NewUrl, UrlRecord};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("URL not found: {0}")]
    UrlNotFound(String),

    #[error("Domain not found: {0}")]
    DomainNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for frontier storage backends
///
/// Every mutation is a single conditional statement or a short transaction,
/// so several processes can share one backing store. Operations that stamp
/// times take `now` from the caller.
pub trait Storage {
    // ===== Domain Registry =====

    /// Returns the id for a normalized domain, creating the record if absent
    ///
    /// # Arguments
    ///
    /// * `normalized_domain` - Canonical domain name
    /// * `notes` - Free text stored only when the record is created
    /// * `now` - Creation time
    ///
    /// # Returns
    ///
    /// The domain id and whether this call created it
    fn resolve_or_create_domain(
        &mut self,
        normalized_domain: &str,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> StorageResult<(i64, bool)>;

    /// Gets a domain by id
    fn find_domain(&self, domain_id: i64) -> StorageResult<Option<DomainRecord>>;

    /// Gets a domain by its normalized name
    fn find_domain_by_name(&self, normalized_domain: &str) -> StorageResult<Option<DomainRecord>>;

    /// Sets a domain's status and touches `last_seen`
    ///
    /// Returns false when no domain has that id.
    fn mark_domain_status(
        &mut self,
        domain_id: i64,
        status: DomainStatus,
        now: DateTime<Utc>,
    ) -> StorageResult<bool>;

    /// Lists all domains with `active` status
    fn list_active_domains(&self) -> StorageResult<Vec<DomainRecord>>;

    // ===== URL Records =====

    /// Inserts a pending URL record unless its fingerprint is already known
    ///
    /// Existing records are never modified.
    ///
    /// # Returns
    ///
    /// The record id and whether this call created it
    fn insert_url_if_absent(&mut self, url: &NewUrl, now: DateTime<Utc>)
        -> StorageResult<(i64, bool)>;

    /// Gets a URL record by id
    fn get_url(&self, url_id: i64) -> StorageResult<UrlRecord>;

    /// Gets a URL record by fingerprint
    fn get_url_by_fingerprint(&self, fingerprint: &str) -> StorageResult<Option<UrlRecord>>;

    // ===== Claiming =====

    /// Selects up to `limit` eligible record ids, least recently crawled first
    ///
    /// A record is eligible when it has never been claimed, when its last
    /// crawl is older than `cutoff`, or when it is processing under a lock
    /// taken before `cutoff`.
    fn select_claim_candidates(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
        require_domain: bool,
    ) -> StorageResult<Vec<i64>>;

    /// Locks every candidate that is still eligible for `owner`
    ///
    /// Eligibility is re-checked in the same statement that takes the lock,
    /// so a record claimed by a faster worker in the meantime is skipped.
    ///
    /// # Returns
    ///
    /// Number of records locked
    fn lock_candidates(
        &mut self,
        candidates: &[i64],
        owner: &str,
        now: DateTime<Utc>,
        cutoff: DateTime<Utc>,
        require_domain: bool,
    ) -> StorageResult<usize>;

    /// Reads back every record currently locked by `owner`
    fn find_owned(&self, owner: &str) -> StorageResult<Vec<ClaimedUrl>>;

    // ===== Finalization =====

    /// Marks a record completed and attaches its results
    ///
    /// Only applies while `owner` still holds the lock. Returns false when
    /// the record was reclaimed by someone else.
    fn finalize_success(
        &mut self,
        url_id: i64,
        owner: &str,
        results: &CrawlResults,
        now: DateTime<Utc>,
    ) -> StorageResult<bool>;

    /// Marks a record as failed with a short reason
    ///
    /// Same ownership guard as [`Storage::finalize_success`].
    fn finalize_failure(
        &mut self,
        url_id: i64,
        owner: &str,
        reason: &str,
        http_status: Option<u16>,
        now: DateTime<Utc>,
    ) -> StorageResult<bool>;

    // ===== Statistics =====

    /// Counts URL records per status
    fn count_urls_by_status(&self) -> StorageResult<HashMap<UrlStatus, u64>>;

    /// Counts all URL records
    fn count_total_urls(&self) -> StorageResult<u64>;

    /// Counts URL records without a resolved domain
    fn count_unresolved_urls(&self) -> StorageResult<u64>;

    /// Counts domains per status
    fn count_domains_by_status(&self) -> StorageResult<HashMap<DomainStatus, u64>>;

    /// Counts records a claim issued with this cutoff would consider
    fn count_eligible(&self, cutoff: DateTime<Utc>, require_domain: bool) -> StorageResult<u64>;
}
