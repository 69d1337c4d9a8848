//! Domain registry and seeding
//!
//! Operators register sites by name; every active site is crawled starting
//! from its homepage. Seeding also accepts individual URLs.

use crate::state::DomainStatus;
use crate::storage::{NewUrl, Storage};
use crate::url::{canonicalize_domain, extract_domain, normalize_url};
use crate::{CrawlError, Result};
use chrono::{DateTime, Utc};

/// Result of registering a domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededDomain {
    pub domain_id: i64,
    pub normalized_domain: String,
    pub created: bool,
    /// Id of the homepage record, new or existing
    pub homepage_id: i64,
}

/// Result of seeding a single URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededUrl {
    pub url_id: i64,
    pub normalized_url: String,
    pub domain_id: Option<i64>,
    pub created: bool,
}

/// Registers a domain and queues its homepage
///
/// Idempotent: an existing domain keeps its id, status and notes.
pub fn seed_domain<S: Storage + ?Sized>(
    storage: &mut S,
    name: &str,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> Result<SeededDomain> {
    let normalized_domain = canonicalize_domain(name)?;
    let (domain_id, created) = storage.resolve_or_create_domain(&normalized_domain, notes, now)?;

    let homepage = normalize_url(&format!("https://{}/", normalized_domain))?;
    let (homepage_id, _) = storage.insert_url_if_absent(&NewUrl::from_url(&homepage, Some(domain_id)), now)?;

    if created {
        tracing::info!("Registered domain {} with id {}", normalized_domain, domain_id);
    } else {
        tracing::info!("Domain {} already registered with id {}", normalized_domain, domain_id);
    }

    Ok(SeededDomain {
        domain_id,
        normalized_domain,
        created,
        homepage_id,
    })
}

/// Queues a single URL
///
/// Without an explicit `domain_id` the URL's domain is resolved or created.
/// An explicit id must name a registered domain.
pub fn seed_url<S: Storage + ?Sized>(
    storage: &mut S,
    raw_url: &str,
    domain_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<SeededUrl> {
    let url = normalize_url(raw_url)?;

    let domain_id = match domain_id {
        Some(id) => {
            storage
                .find_domain(id)?
                .ok_or(CrawlError::DomainNotFound(id))?;
            id
        }
        None => {
            let domain = extract_domain(&url).ok_or(crate::UrlError::MissingDomain)?;
            storage.resolve_or_create_domain(&domain, None, now)?.0
        }
    };

    let (url_id, created) = storage.insert_url_if_absent(&NewUrl::from_url(&url, Some(domain_id)), now)?;

    if created {
        tracing::info!("Added seed URL {} with id {}", url, url_id);
    } else {
        tracing::info!("URL {} already exists with id {}", url, url_id);
    }

    Ok(SeededUrl {
        url_id,
        normalized_url: url.to_string(),
        domain_id: Some(domain_id),
        created,
    })
}

/// Ensures every active domain has its homepage queued
///
/// Returns how many homepage records were created.
pub fn seed_homepages<S: Storage + ?Sized>(storage: &mut S, now: DateTime<Utc>) -> Result<usize> {
    let domains = storage.list_active_domains()?;
    let mut created = 0;

    for domain in &domains {
        let homepage = match normalize_url(&domain.homepage()) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Skipping homepage for {}: {}", domain.normalized_domain, e);
                continue;
            }
        };

        if storage
            .insert_url_if_absent(&NewUrl::from_url(&homepage, Some(domain.id)), now)?
            .1
        {
            created += 1;
        }
    }

    tracing::info!(
        "Homepages checked for {} active domains, {} added",
        domains.len(),
        created
    );
    Ok(created)
}

/// Changes a domain's status
///
/// Returns false when no domain has that id.
pub fn mark_status<S: Storage + ?Sized>(
    storage: &mut S,
    domain_id: i64,
    status: DomainStatus,
    now: DateTime<Utc>,
) -> Result<bool> {
    let found = storage.mark_domain_status(domain_id, status, now)?;
    if found {
        tracing::info!("Domain {} marked {}", domain_id, status);
    } else {
        tracing::warn!("Domain {} not found", domain_id);
    }
    Ok(found)
}
