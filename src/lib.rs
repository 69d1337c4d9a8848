//! Tidewater: a distributed crawl frontier
//!
//! This crate tracks every known URL's crawl lifecycle in a shared SQLite
//! store so that any number of cooperating workers can claim, fetch and
//! re-schedule URLs without ever processing the same record twice at once.

pub mod config;
pub mod crawler;
pub mod frontier;
pub mod output;
pub mod registry;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Tidewater operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Domain not found: {0}")]
    DomainNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage handle unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Worker error: {0}")]
    Worker(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),

    #[error("Empty link")]
    Empty,
}

/// Result type alias for Tidewater operations
pub type Result<T> = std::result::Result<T, CrawlError>;

// Re-export commonly used types
pub use config::Config;
pub use frontier::{claim_batch, ClaimPolicy, ClaimedUrl, OwnerToken};
pub use state::{DomainStatus, UrlStatus};
pub use url::{extract_domain, fingerprint, normalize_link, normalize_url};
