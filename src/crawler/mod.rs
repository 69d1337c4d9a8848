//! Crawler module for fetching and processing claimed URLs
//!
//! This module contains the worker side of the frontier, including:
//! - HTTP fetching with manual redirect handling
//! - HTML link, email and entity extraction
//! - The batch worker that claims, fetches and finalizes records

mod extractor;
mod fetcher;
mod worker;

pub use extractor::{Entities, ExtractError, ExtractedLinks, Extractor, HtmlExtractor};
pub use fetcher::{build_http_client, FetchError, FetchedPage, Fetcher, HttpFetcher};
pub use worker::{BatchReport, RunReport, Worker, WorkerSettings};

use crate::config::Config;
use crate::storage::open_storage;
use crate::Result;
use std::path::Path;

/// Runs a complete crawl against the configured database
///
/// This is the main entry point for a worker process. It will:
/// 1. Open the shared store
/// 2. Queue homepages of active domains
/// 3. Claim and process batches until nothing is eligible or
///    `max_batches` is reached
///
/// # Example
///
/// ```no_run
/// use tidewater::config::load_config;
/// use tidewater::crawler::crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("tidewater.toml"))?;
/// let report = crawl(&config, Some(1)).await?;
/// println!("{} completed", report.totals.completed);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: &Config, max_batches: Option<usize>) -> Result<RunReport> {
    let storage = open_storage(
        Path::new(&config.store.database_path),
        config.store.busy_timeout(),
    )?;
    let worker = Worker::from_config(config, storage)?;
    worker.run(max_batches).await
}
