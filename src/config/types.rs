use chrono::Duration as ChronoDuration;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Tidewater
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
}

/// Shared store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database shared by all workers
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// How long a write waits on another worker's lock before failing (milliseconds)
    #[serde(rename = "busy-timeout-ms")]
    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: "./tidewater.db".to_string(),
            busy_timeout_ms: 5_000,
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of URLs claimed per batch
    #[serde(rename = "batch-size")]
    pub batch_size: u32,

    /// Minimum age before a completed, errored or stuck URL is eligible again (hours)
    #[serde(rename = "recrawl-window-hours")]
    pub recrawl_window_hours: u32,

    /// Per-fetch timeout (seconds)
    #[serde(rename = "fetch-timeout-secs")]
    pub fetch_timeout_secs: u64,

    /// Maximum number of claimed URLs fetched in parallel by one worker
    #[serde(rename = "max-concurrent-fetches")]
    pub max_concurrent_fetches: u32,

    /// Maximum redirect hops followed per fetch
    #[serde(rename = "max-redirects")]
    pub max_redirects: u32,

    /// Persist links that point at other sites
    #[serde(rename = "store-external-links")]
    pub store_external_links: bool,

    /// Only claim URLs whose domain has been resolved
    #[serde(rename = "require-domain")]
    pub require_domain: bool,

    /// Keep the fetched page body on the completed record
    #[serde(rename = "store-content")]
    pub store_content: bool,
}

impl CrawlerConfig {
    /// The recrawl window as a chrono duration, for timestamp arithmetic
    pub fn recrawl_window(&self) -> ChronoDuration {
        ChronoDuration::hours(i64::from(self.recrawl_window_hours))
    }

    /// The per-fetch timeout
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            recrawl_window_hours: 48,
            fetch_timeout_secs: 30,
            max_concurrent_fetches: 4,
            max_redirects: 10,
            store_external_links: true,
            require_domain: false,
            store_content: true,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "Tidewater".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/crawler".to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}
