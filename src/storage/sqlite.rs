//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! Several processes may open the same database file; WAL mode plus the
//! busy timeout lets them take turns on the write lock.

use crate::state::{DomainStatus, UrlStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    format_timestamp, ClaimedUrl, CrawlResults, DomainRecord, NewUrl, RedirectHop, UrlRecord,
};
use crate::CrawlError;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{named_params, params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Filter shared by candidate selection, locking and the eligible count
///
/// Unrecognized statuses fall into the first branch and are treated as
/// pending.
const ELIGIBLE_SQL: &str = "(
        status NOT IN ('processing', 'completed', 'error')
        OR (status IN ('completed', 'error')
            AND (last_crawled IS NULL OR last_crawled < :cutoff))
        OR (status = 'processing'
            AND (locked_at IS NULL OR locked_at < :cutoff))
    )
    AND (:require_domain = 0 OR domain_id IS NOT NULL)";

const URL_COLUMNS: &str = "id, fingerprint, normalized_url, domain_id, normalized_domain, status,
     locked_by, locked_at, last_crawled, discovered_at, http_status, final_url,
     redirect_chain, emails, organizations, persons, content, error_message";

const DOMAIN_COLUMNS: &str = "id, normalized_domain, status, notes, first_seen, last_seen";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `busy_timeout` - How long to wait for another connection's write lock
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(CrawlError)` - Failed to open database
    pub fn new(path: &Path, busy_timeout: Duration) -> Result<Self, CrawlError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    ///
    /// Each call gets a private database; use a file for anything shared.
    pub fn new_in_memory() -> Result<Self, CrawlError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Direct access to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn query_domain(&self, filter: &str, value: &dyn rusqlite::ToSql) -> StorageResult<Option<DomainRecord>> {
        let sql = format!("SELECT {} FROM domains WHERE {} = ?1", DOMAIN_COLUMNS, filter);
        let domain = self
            .conn
            .query_row(&sql, params![value], domain_from_row)
            .optional()?;
        Ok(domain)
    }
}

fn domain_from_row(row: &Row) -> rusqlite::Result<DomainRecord> {
    Ok(DomainRecord {
        id: row.get(0)?,
        normalized_domain: row.get(1)?,
        status: DomainStatus::from_db_string(&row.get::<_, String>(2)?),
        notes: row.get(3)?,
        first_seen: row.get(4)?,
        last_seen: row.get(5)?,
    })
}

fn url_from_row(row: &Row) -> rusqlite::Result<UrlRecord> {
    Ok(UrlRecord {
        id: row.get(0)?,
        fingerprint: row.get(1)?,
        normalized_url: row.get(2)?,
        domain_id: row.get(3)?,
        normalized_domain: row.get(4)?,
        status: UrlStatus::from_db_string(&row.get::<_, String>(5)?),
        locked_by: row.get(6)?,
        locked_at: row.get(7)?,
        last_crawled: row.get(8)?,
        discovered_at: row.get(9)?,
        http_status: row.get(10)?,
        final_url: row.get(11)?,
        redirect_chain: json_column::<Vec<RedirectHop>>(row, 12)?,
        emails: json_column(row, 13)?,
        organizations: json_column(row, 14)?,
        persons: json_column(row, 15)?,
        content: row.get(16)?,
        error_message: row.get(17)?,
    })
}

/// Decodes a nullable JSON text column, NULL meaning the default value
fn json_column<T: DeserializeOwned + Default>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    match row.get::<_, Option<String>>(idx)? {
        Some(text) => serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(T::default()),
    }
}

impl Storage for SqliteStorage {
    // ===== Domain Registry =====

    fn resolve_or_create_domain(
        &mut self,
        normalized_domain: &str,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> StorageResult<(i64, bool)> {
        let now = format_timestamp(&now);
        let inserted = self.conn.execute(
            "INSERT INTO domains (normalized_domain, status, notes, first_seen, last_seen)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(normalized_domain) DO NOTHING",
            params![
                normalized_domain,
                DomainStatus::Active.to_db_string(),
                notes,
                now
            ],
        )?;

        if inserted == 1 {
            return Ok((self.conn.last_insert_rowid(), true));
        }

        // Lost the insert to an existing row; the unique index guarantees one
        let id: i64 = self.conn.query_row(
            "SELECT id FROM domains WHERE normalized_domain = ?1",
            params![normalized_domain],
            |row| row.get(0),
        )?;
        Ok((id, false))
    }

    fn find_domain(&self, domain_id: i64) -> StorageResult<Option<DomainRecord>> {
        self.query_domain("id", &domain_id)
    }

    fn find_domain_by_name(&self, normalized_domain: &str) -> StorageResult<Option<DomainRecord>> {
        self.query_domain("normalized_domain", &normalized_domain)
    }

    fn mark_domain_status(
        &mut self,
        domain_id: i64,
        status: DomainStatus,
        now: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let updated = self.conn.execute(
            "UPDATE domains SET status = ?1, last_seen = ?2 WHERE id = ?3",
            params![status.to_db_string(), format_timestamp(&now), domain_id],
        )?;
        Ok(updated > 0)
    }

    fn list_active_domains(&self) -> StorageResult<Vec<DomainRecord>> {
        let sql = format!(
            "SELECT {} FROM domains WHERE status = ?1 ORDER BY id",
            DOMAIN_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let domains = stmt
            .query_map(
                params![DomainStatus::Active.to_db_string()],
                domain_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(domains)
    }

    // ===== URL Records =====

    fn insert_url_if_absent(
        &mut self,
        url: &NewUrl,
        now: DateTime<Utc>,
    ) -> StorageResult<(i64, bool)> {
        let inserted = self.conn.execute(
            "INSERT INTO urls (fingerprint, normalized_url, domain_id, normalized_domain, status, discovered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(fingerprint) DO NOTHING",
            params![
                url.fingerprint,
                url.normalized_url,
                url.domain_id,
                url.normalized_domain,
                UrlStatus::Pending.to_db_string(),
                format_timestamp(&now)
            ],
        )?;

        if inserted == 1 {
            return Ok((self.conn.last_insert_rowid(), true));
        }

        let id: i64 = self.conn.query_row(
            "SELECT id FROM urls WHERE fingerprint = ?1",
            params![url.fingerprint],
            |row| row.get(0),
        )?;
        Ok((id, false))
    }

    fn get_url(&self, url_id: i64) -> StorageResult<UrlRecord> {
        let sql = format!("SELECT {} FROM urls WHERE id = ?1", URL_COLUMNS);
        self.conn
            .query_row(&sql, params![url_id], url_from_row)
            .optional()?
            .ok_or_else(|| StorageError::UrlNotFound(format!("URL ID {}", url_id)))
    }

    fn get_url_by_fingerprint(&self, fingerprint: &str) -> StorageResult<Option<UrlRecord>> {
        let sql = format!("SELECT {} FROM urls WHERE fingerprint = ?1", URL_COLUMNS);
        let record = self
            .conn
            .query_row(&sql, params![fingerprint], url_from_row)
            .optional()?;
        Ok(record)
    }

    // ===== Claiming =====

    fn select_claim_candidates(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
        require_domain: bool,
    ) -> StorageResult<Vec<i64>> {
        let sql = format!(
            "SELECT id FROM urls WHERE {}
             ORDER BY last_crawled IS NOT NULL, last_crawled ASC, id ASC
             LIMIT :limit",
            ELIGIBLE_SQL
        );
        let limit = limit as i64;
        let mut stmt = self.conn.prepare(&sql)?;

        let ids = stmt
            .query_map(
                named_params! {
                    ":cutoff": format_timestamp(&cutoff),
                    ":require_domain": require_domain,
                    ":limit": limit,
                },
                |row| row.get(0),
            )?
            .collect::<Result<Vec<i64>, _>>()?;

        Ok(ids)
    }

    fn lock_candidates(
        &mut self,
        candidates: &[i64],
        owner: &str,
        now: DateTime<Utc>,
        cutoff: DateTime<Utc>,
        require_domain: bool,
    ) -> StorageResult<usize> {
        if candidates.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "UPDATE urls SET status = 'processing', locked_by = :owner, locked_at = :now
             WHERE id = :id AND {}",
            ELIGIBLE_SQL
        );
        let now = format_timestamp(&now);
        let cutoff = format_timestamp(&cutoff);

        // Take the write lock up front so the whole batch commits at once
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut locked = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for id in candidates {
                locked += stmt.execute(named_params! {
                    ":owner": owner,
                    ":now": now,
                    ":id": id,
                    ":cutoff": cutoff,
                    ":require_domain": require_domain,
                })?;
            }
        }
        tx.commit()?;

        Ok(locked)
    }

    fn find_owned(&self, owner: &str) -> StorageResult<Vec<ClaimedUrl>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, normalized_url, domain_id, locked_by FROM urls
             WHERE status = 'processing' AND locked_by = ?1
             ORDER BY last_crawled IS NOT NULL, last_crawled ASC, id ASC",
        )?;

        let claimed = stmt
            .query_map(params![owner], |row| {
                Ok(ClaimedUrl {
                    id: row.get(0)?,
                    url: row.get(1)?,
                    domain_id: row.get(2)?,
                    locked_by: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(claimed)
    }

    // ===== Finalization =====

    fn finalize_success(
        &mut self,
        url_id: i64,
        owner: &str,
        results: &CrawlResults,
        now: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let redirect_chain = serde_json::to_string(&results.redirect_chain)?;
        let emails = serde_json::to_string(&results.emails)?;
        let organizations = serde_json::to_string(&results.organizations)?;
        let persons = serde_json::to_string(&results.persons)?;

        let updated = self.conn.execute(
            "UPDATE urls SET status = ?1, locked_by = NULL, locked_at = NULL, last_crawled = ?2,
             http_status = ?3, final_url = ?4, redirect_chain = ?5, emails = ?6,
             organizations = ?7, persons = ?8, content = ?9, error_message = NULL
             WHERE id = ?10 AND locked_by = ?11",
            params![
                UrlStatus::Completed.to_db_string(),
                format_timestamp(&now),
                results.http_status,
                results.final_url,
                redirect_chain,
                emails,
                organizations,
                persons,
                results.content,
                url_id,
                owner
            ],
        )?;

        Ok(updated == 1)
    }

    fn finalize_failure(
        &mut self,
        url_id: i64,
        owner: &str,
        reason: &str,
        http_status: Option<u16>,
        now: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let updated = self.conn.execute(
            "UPDATE urls SET status = ?1, locked_by = NULL, locked_at = NULL, last_crawled = ?2,
             http_status = ?3, error_message = ?4
             WHERE id = ?5 AND locked_by = ?6",
            params![
                UrlStatus::Error.to_db_string(),
                format_timestamp(&now),
                http_status,
                reason,
                url_id,
                owner
            ],
        )?;

        Ok(updated == 1)
    }

    // ===== Statistics =====

    fn count_urls_by_status(&self) -> StorageResult<HashMap<UrlStatus, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM urls GROUP BY status")?;

        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status, count))
        })?;

        let mut counts: HashMap<UrlStatus, u64> = UrlStatus::all().iter().map(|s| (*s, 0)).collect();
        for row in rows {
            let (status, count) = row?;
            *counts.entry(UrlStatus::from_db_string(&status)).or_insert(0) += count as u64;
        }

        Ok(counts)
    }

    fn count_total_urls(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM urls", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_unresolved_urls(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM urls WHERE domain_id IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_domains_by_status(&self) -> StorageResult<HashMap<DomainStatus, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM domains GROUP BY status")?;

        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status, count))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (status, count) = row?;
            *counts.entry(DomainStatus::from_db_string(&status)).or_insert(0) += count as u64;
        }

        Ok(counts)
    }

    fn count_eligible(&self, cutoff: DateTime<Utc>, require_domain: bool) -> StorageResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM urls WHERE {}", ELIGIBLE_SQL);
        let count: i64 = self.conn.query_row(
            &sql,
            named_params! {
                ":cutoff": format_timestamp(&cutoff),
                ":require_domain": require_domain,
            },
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
