//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the frontier database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Registered sites, one row per normalized domain
CREATE TABLE IF NOT EXISTS domains (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    normalized_domain TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL DEFAULT 'active',
    notes TEXT,
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_domains_status ON domains(status);
CREATE INDEX IF NOT EXISTS idx_domains_last_seen ON domains(last_seen);

-- Every known URL and its crawl lifecycle
CREATE TABLE IF NOT EXISTS urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    fingerprint TEXT NOT NULL UNIQUE,
    normalized_url TEXT NOT NULL,
    domain_id INTEGER REFERENCES domains(id),
    normalized_domain TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    locked_by TEXT,
    locked_at TEXT,
    last_crawled TEXT,
    discovered_at TEXT NOT NULL,
    http_status INTEGER,
    final_url TEXT,
    redirect_chain TEXT,
    emails TEXT,
    organizations TEXT,
    persons TEXT,
    content TEXT,
    error_message TEXT,
    CHECK ((status = 'processing') = (locked_by IS NOT NULL AND locked_at IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS idx_urls_domain_id ON urls(domain_id);
CREATE INDEX IF NOT EXISTS idx_urls_normalized_domain ON urls(normalized_domain);
CREATE INDEX IF NOT EXISTS idx_urls_status ON urls(status);
CREATE INDEX IF NOT EXISTS idx_urls_last_crawled ON urls(last_crawled);
CREATE INDEX IF NOT EXISTS idx_urls_locked_by ON urls(locked_by);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
