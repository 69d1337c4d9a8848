//! Crawl worker - claims batches and drives each record to a final status
//!
//! One worker process runs batches until the frontier has nothing eligible
//! (or a batch limit is reached). Within a batch, claimed records are
//! fetched concurrently up to a configured bound. Every record ends in
//! `completed` or `error`; the only exception is a store failure, which
//! aborts the batch and leaves the remaining locks to expire.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::{Extractor, FetchError, Fetcher, HtmlExtractor, HttpFetcher};
use crate::frontier::{claim_batch, store_discovered_links, ClaimPolicy, ClaimedUrl, OwnerToken};
use crate::registry::seed_homepages;
use crate::storage::{CrawlResults, SqliteStorage, Storage};
use crate::url::is_same_domain;
use crate::{CrawlError, Result};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Longest failure reason written to a record
const MAX_REASON_LEN: usize = 200;

/// Knobs the worker reads from `[crawler]`
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub batch_size: usize,
    pub max_concurrent_fetches: usize,
    pub fetch_timeout: Duration,
    pub store_external_links: bool,
    pub store_content: bool,
    pub policy: ClaimPolicy,
}

impl WorkerSettings {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            batch_size: config.batch_size as usize,
            max_concurrent_fetches: config.max_concurrent_fetches.max(1) as usize,
            fetch_timeout: config.fetch_timeout(),
            store_external_links: config.store_external_links,
            store_content: config.store_content,
            policy: ClaimPolicy::from_config(config),
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

/// Counts for one claimed batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub claimed: usize,
    pub completed: usize,
    pub failed: usize,
    /// Records another worker reclaimed before this one finalized
    pub lost: usize,
    pub links_created: usize,
}

impl BatchReport {
    fn absorb(&mut self, other: &BatchReport) {
        self.claimed += other.claimed;
        self.completed += other.completed;
        self.failed += other.failed;
        self.lost += other.lost;
        self.links_created += other.links_created;
    }
}

/// Totals for a whole crawl run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub batches: usize,
    pub homepages_added: usize,
    pub totals: BatchReport,
}

/// How a single record ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed { links_created: usize },
    Failed,
    Lost,
}

/// Main crawl worker structure
#[derive(Clone)]
pub struct Worker {
    storage: Arc<Mutex<SqliteStorage>>,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    settings: WorkerSettings,
}

impl Worker {
    pub fn new(
        storage: Arc<Mutex<SqliteStorage>>,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            storage,
            fetcher,
            extractor,
            settings,
        }
    }

    /// Creates a worker with the HTTP fetcher and HTML extractor
    pub fn from_config(config: &Config, storage: SqliteStorage) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.user_agent, config.crawler.max_redirects as usize)?;

        Ok(Self::new(
            Arc::new(Mutex::new(storage)),
            Arc::new(fetcher),
            Arc::new(HtmlExtractor::new()),
            WorkerSettings::from_config(&config.crawler),
        ))
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Shared handle to the worker's store
    pub fn storage(&self) -> Arc<Mutex<SqliteStorage>> {
        Arc::clone(&self.storage)
    }

    fn lock_storage(&self) -> Result<MutexGuard<'_, SqliteStorage>> {
        self.storage
            .lock()
            .map_err(|e| CrawlError::StorageUnavailable(format!("lock poisoned: {}", e)))
    }

    /// Runs batches until nothing is eligible or `max_batches` is reached
    ///
    /// Homepages of active domains are queued first.
    pub async fn run(&self, max_batches: Option<usize>) -> Result<RunReport> {
        let start_time = Instant::now();
        let mut report = RunReport {
            homepages_added: {
                let mut storage = self.lock_storage()?;
                seed_homepages(&mut *storage, Utc::now())?
            },
            ..RunReport::default()
        };

        loop {
            if max_batches.is_some_and(|max| report.batches >= max) {
                tracing::info!("Reached batch limit of {}", report.batches);
                break;
            }

            let batch = self.run_batch().await?;
            if batch.claimed == 0 {
                tracing::info!("No eligible URLs left, crawl complete");
                break;
            }

            report.batches += 1;
            report.totals.absorb(&batch);
        }

        tracing::info!(
            "Crawl finished: {} batches, {} completed, {} failed, {} lost in {:?}",
            report.batches,
            report.totals.completed,
            report.totals.failed,
            report.totals.lost,
            start_time.elapsed()
        );

        Ok(report)
    }

    /// Claims one batch under a fresh owner token and processes it
    pub async fn run_batch(&self) -> Result<BatchReport> {
        self.run_batch_as(OwnerToken::generate()).await
    }

    /// Claims one batch as `owner` and processes it
    pub async fn run_batch_as(&self, owner: OwnerToken) -> Result<BatchReport> {
        let claimed = {
            let mut storage = self.lock_storage()?;
            claim_batch(
                &mut *storage,
                &owner,
                self.settings.batch_size,
                &self.settings.policy,
                Utc::now(),
            )?
        };

        let mut report = BatchReport {
            claimed: claimed.len(),
            ..BatchReport::default()
        };
        if claimed.is_empty() {
            return Ok(report);
        }

        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_fetches));
        let owner = Arc::new(owner);
        let mut tasks = JoinSet::new();

        for record in claimed {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| CrawlError::Worker(e.to_string()))?;
            let worker = self.clone();
            let owner = Arc::clone(&owner);

            tasks.spawn(async move {
                let _permit = permit;
                worker.process_url(&owner, record).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| CrawlError::Worker(e.to_string()))??;
            match outcome {
                Outcome::Completed { links_created } => {
                    report.completed += 1;
                    report.links_created += links_created;
                }
                Outcome::Failed => report.failed += 1,
                Outcome::Lost => report.lost += 1,
            }
        }

        tracing::info!(
            "Batch done: {} claimed, {} completed, {} failed, {} lost, {} new links",
            report.claimed,
            report.completed,
            report.failed,
            report.lost,
            report.links_created
        );

        Ok(report)
    }

    /// Processes a single claimed record
    ///
    /// This method:
    /// 1. Fetches the page under the configured timeout
    /// 2. Extracts links, emails and entities
    /// 3. Inserts discovered links
    /// 4. Finalizes the record, guarded by ownership
    async fn process_url(&self, owner: &OwnerToken, record: ClaimedUrl) -> Result<Outcome> {
        tracing::debug!("Processing URL: {}", record.url);

        let url = match Url::parse(&record.url) {
            Ok(url) => url,
            Err(e) => {
                return self.fail(owner, &record, &format!("Unparseable URL: {}", e), None);
            }
        };

        let timeout = self.settings.fetch_timeout;
        let fetched = match tokio::time::timeout(timeout, self.fetcher.fetch(&url, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout)),
        };

        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Fetch failed for {}: {}", record.url, e);
                return self.fail(owner, &record, &e.to_string(), e.http_status());
            }
        };

        let links = match self.extractor.extract_links(&page.content, &page.final_url) {
            Ok(links) if is_same_domain(&url, &page.final_url) => links,
            Ok(links) => links.rescope(&url),
            Err(e) => {
                tracing::warn!("Extraction failed for {}: {}", record.url, e);
                return self.fail(owner, &record, &e.to_string(), Some(page.http_status));
            }
        };

        let entities = match self.extractor.extract_entities(&page.content) {
            Ok(entities) => entities,
            Err(e) => {
                tracing::warn!("Entity extraction failed for {}: {}", record.url, e);
                return self.fail(owner, &record, &e.to_string(), Some(page.http_status));
            }
        };

        let results = CrawlResults {
            http_status: page.http_status,
            final_url: page.final_url.to_string(),
            emails: self.extractor.extract_emails(&page.content),
            organizations: entities.organizations,
            persons: entities.persons,
            redirect_chain: page.redirect_chain,
            content: self.settings.store_content.then_some(page.content),
        };

        let mut storage = self.lock_storage()?;
        let now = Utc::now();

        let ingest = store_discovered_links(
            &mut *storage,
            &record,
            &links,
            self.settings.store_external_links,
            now,
        )?;

        if storage.finalize_success(record.id, owner.as_str(), &results, now)? {
            tracing::debug!(
                "Completed {} ({} links, {} new)",
                record.url,
                links.len(),
                ingest.created
            );
            Ok(Outcome::Completed {
                links_created: ingest.created,
            })
        } else {
            tracing::warn!("Lost ownership of {} before finalizing", record.url);
            Ok(Outcome::Lost)
        }
    }

    fn fail(
        &self,
        owner: &OwnerToken,
        record: &ClaimedUrl,
        reason: &str,
        http_status: Option<u16>,
    ) -> Result<Outcome> {
        let reason = truncate_reason(reason);
        let mut storage = self.lock_storage()?;

        if storage.finalize_failure(record.id, owner.as_str(), &reason, http_status, Utc::now())? {
            Ok(Outcome::Failed)
        } else {
            tracing::warn!("Lost ownership of {} before recording failure", record.url);
            Ok(Outcome::Lost)
        }
    }
}

fn truncate_reason(reason: &str) -> String {
    if reason.chars().count() <= MAX_REASON_LEN {
        reason.to_string()
    } else {
        reason.chars().take(MAX_REASON_LEN).collect()
    }
}
