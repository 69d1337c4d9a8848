use crate::crawler::ExtractedLinks;
use crate::storage::{ClaimedUrl, NewUrl, Storage};
use crate::url::extract_domain;
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Outcome of ingesting one page's links
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkIngestReport {
    /// New pending records
    pub created: usize,
    /// Links whose fingerprint was already known
    pub existing: usize,
    /// External links dropped because external storage is disabled
    pub external_skipped: usize,
}

/// Inserts the links found on `source` as pending records
///
/// Internal links inherit the source record's domain id. External links
/// take the id of a registered domain with the same name, or stay
/// unresolved. Known fingerprints are left untouched.
///
/// # Arguments
///
/// * `storage` - The frontier store
/// * `source` - The record the links were found on
/// * `links` - Normalized links split by scope
/// * `store_external` - Whether external links are persisted at all
/// * `now` - Discovery time for new records
pub fn store_discovered_links<S: Storage + ?Sized>(
    storage: &mut S,
    source: &ClaimedUrl,
    links: &ExtractedLinks,
    store_external: bool,
    now: DateTime<Utc>,
) -> Result<LinkIngestReport> {
    let mut report = LinkIngestReport::default();

    for link in &links.internal {
        let (_, created) = storage.insert_url_if_absent(&NewUrl::from_url(link, source.domain_id), now)?;
        report.record(created);
    }

    if !store_external {
        report.external_skipped = links.external.len();
        return Ok(report);
    }

    let mut known_domains: HashMap<String, Option<i64>> = HashMap::new();
    for link in &links.external {
        let domain_id = match extract_domain(link) {
            Some(domain) => match known_domains.get(&domain) {
                Some(id) => *id,
                None => {
                    let id = storage.find_domain_by_name(&domain)?.map(|d| d.id);
                    known_domains.insert(domain, id);
                    id
                }
            },
            None => None,
        };

        let (_, created) = storage.insert_url_if_absent(&NewUrl::from_url(link, domain_id), now)?;
        if created {
            tracing::debug!("Discovered external link {} (domain {:?})", link, domain_id);
        }
        report.record(created);
    }

    Ok(report)
}

impl LinkIngestReport {
    fn record(&mut self, created: bool) {
        if created {
            self.created += 1;
        } else {
            self.existing += 1;
        }
    }
}
