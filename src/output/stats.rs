//! Statistics generation from the frontier database
//!
//! This module provides functionality for extracting and displaying
//! frontier statistics from the storage layer.

use crate::frontier::ClaimPolicy;
use crate::state::{DomainStatus, UrlStatus};
use crate::storage::Storage;
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Frontier statistics summary
#[derive(Debug, Clone)]
pub struct FrontierStatistics {
    /// Total number of URL records
    pub total_urls: u64,

    /// Count of URL records by status
    pub urls_by_status: HashMap<UrlStatus, u64>,

    /// Count of registered domains by status
    pub domains_by_status: HashMap<DomainStatus, u64>,

    /// URL records with no resolved domain
    pub unresolved_urls: u64,

    /// Records a claim issued now would consider
    pub claimable_now: u64,
}

impl FrontierStatistics {
    pub fn count(&self, status: UrlStatus) -> u64 {
        self.urls_by_status.get(&status).copied().unwrap_or(0)
    }

    pub fn total_domains(&self) -> u64 {
        self.domains_by_status.values().sum()
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `policy` - Window and domain filter used for the claimable count
/// * `now` - Reference time for the claimable count
///
/// # Returns
///
/// * `Ok(FrontierStatistics)` - Successfully loaded statistics
/// * `Err(CrawlError)` - Failed to query statistics
pub fn load_statistics(
    storage: &dyn Storage,
    policy: &ClaimPolicy,
    now: DateTime<Utc>,
) -> Result<FrontierStatistics> {
    Ok(FrontierStatistics {
        total_urls: storage.count_total_urls()?,
        urls_by_status: storage.count_urls_by_status()?,
        domains_by_status: storage.count_domains_by_status()?,
        unresolved_urls: storage.count_unresolved_urls()?,
        claimable_now: storage.count_eligible(policy.cutoff(now), policy.require_domain)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &FrontierStatistics) {
    println!("=== Frontier Statistics ===\n");

    println!("Overview:");
    println!("  Total URLs: {}", stats.total_urls);
    println!(
        "  Domains: {} ({} active, {} inactive)",
        stats.total_domains(),
        stats.domains_by_status.get(&DomainStatus::Active).unwrap_or(&0),
        stats.domains_by_status.get(&DomainStatus::Inactive).unwrap_or(&0)
    );
    println!("  Unresolved URLs: {}", stats.unresolved_urls);
    println!("  Claimable now: {}", stats.claimable_now);
    println!();

    println!("URLs by Status:");
    for status in UrlStatus::all() {
        let count = stats.count(status);
        let percentage = if stats.total_urls > 0 {
            (count as f64 / stats.total_urls as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
}
