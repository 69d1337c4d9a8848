use crate::config::CrawlerConfig;
use crate::frontier::OwnerToken;
use crate::storage::{ClaimedUrl, Storage};
use crate::Result;
use chrono::{DateTime, Duration, Utc};

/// Parameters that decide which records a claim may take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimPolicy {
    /// How long a crawled record rests before it is eligible again. Also the
    /// age at which a processing lock is considered abandoned.
    pub recrawl_window: Duration,

    /// Skip records whose domain has not been resolved
    pub require_domain: bool,
}

impl Default for ClaimPolicy {
    fn default() -> Self {
        Self {
            recrawl_window: Duration::hours(48),
            require_domain: false,
        }
    }
}

impl ClaimPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            recrawl_window: config.recrawl_window(),
            require_domain: config.require_domain,
        }
    }

    /// Records last touched before this instant are eligible
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.recrawl_window
    }
}

/// Reserves up to `limit` eligible records for `owner`
///
/// # Protocol
///
/// 1. Compute the cutoff as `now - recrawl_window`
/// 2. Select up to `limit` eligible ids, least recently crawled first
/// 3. Lock each candidate with a statement that re-checks eligibility, so
///    records taken by another worker in between are skipped
/// 4. Read back the records now owned by `owner`
///
/// The read-back is the batch. Losing races only makes it smaller; an empty
/// batch is a normal outcome.
///
/// # Arguments
///
/// * `storage` - The frontier store
/// * `owner` - Token for this attempt; must not be reused across attempts
/// * `limit` - Maximum batch size
/// * `policy` - Window and domain filter
/// * `now` - Current time
///
/// # Returns
///
/// * `Ok(Vec<ClaimedUrl>)` - The records this owner now holds
/// * `Err(CrawlError)` - The store failed
pub fn claim_batch<S: Storage + ?Sized>(
    storage: &mut S,
    owner: &OwnerToken,
    limit: usize,
    policy: &ClaimPolicy,
    now: DateTime<Utc>,
) -> Result<Vec<ClaimedUrl>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let cutoff = policy.cutoff(now);
    let candidates = storage.select_claim_candidates(cutoff, limit, policy.require_domain)?;

    if candidates.is_empty() {
        tracing::debug!("No eligible URLs before {}", cutoff);
        return Ok(Vec::new());
    }

    let locked = storage.lock_candidates(
        &candidates,
        owner.as_str(),
        now,
        cutoff,
        policy.require_domain,
    )?;

    if locked < candidates.len() {
        tracing::debug!(
            "Lost {} of {} candidates to other workers",
            candidates.len() - locked,
            candidates.len()
        );
    }

    let claimed = storage.find_owned(owner.as_str())?;
    tracing::info!("Claimed {} URLs as {}", claimed.len(), owner);

    Ok(claimed)
}
