//! Claim protocol tests: dedup, exclusivity and window eligibility

use crate::common::{open, seed, t0, temp_db};
use chrono::Duration;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use tidewater::crawler::ExtractedLinks;
use tidewater::frontier::store_discovered_links;
use tidewater::storage::{CrawlResults, SqliteStorage, Storage};
use tidewater::{
    claim_batch, fingerprint, normalize_url, ClaimPolicy, ClaimedUrl, OwnerToken, UrlStatus,
};

#[test]
fn test_same_link_from_two_pages_creates_one_record() {
    let mut storage = SqliteStorage::new_in_memory().unwrap();

    let first = seed(&mut storage, "https://example.com/shared", None);
    let second = seed(&mut storage, "https://WWW.example.com/shared#section", None);

    assert_eq!(first, second);
    assert_eq!(storage.count_total_urls().unwrap(), 1);
}

#[test]
fn test_normalization_is_idempotent() {
    let a = normalize_url("https://WWW.Example.com/a#frag").unwrap();
    let b = normalize_url("http://example.com/a").unwrap();

    assert_eq!(a.host_str(), Some("example.com"));
    assert_eq!(b.host_str(), Some("example.com"));
    assert_eq!(a.path(), "/a");
    assert_eq!(b.path(), "/a");
    assert_eq!(a.scheme(), "https");
    assert_eq!(b.scheme(), "http");

    assert_eq!(normalize_url(a.as_str()).unwrap(), a);
    assert_eq!(fingerprint(a.as_str()), fingerprint(normalize_url(a.as_str()).unwrap().as_str()));
}

#[test]
fn test_concurrent_workers_never_share_a_record() {
    let (_dir, path) = temp_db();
    {
        let mut storage = open(&path);
        for i in 0..60 {
            seed(&mut storage, &format!("https://example.com/page/{}", i), None);
        }
    }

    let workers = 4;
    let barrier = Arc::new(Barrier::new(workers));
    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut storage = open(&path);
                let policy = ClaimPolicy::default();
                let mut mine = Vec::new();
                barrier.wait();
                loop {
                    let owner = OwnerToken::generate();
                    let batch = claim_batch(&mut storage, &owner, 7, &policy, t0()).unwrap();
                    if batch.is_empty() {
                        break;
                    }
                    for claimed in &batch {
                        assert_eq!(claimed.locked_by, owner.as_str());
                    }
                    mine.extend(batch.into_iter().map(|c| c.id));
                }
                mine
            })
        })
        .collect();

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.join().unwrap());
    }

    let unique: HashSet<i64> = all.iter().copied().collect();
    assert_eq!(all.len(), 60, "every record claimed exactly once");
    assert_eq!(unique.len(), 60);
}

#[test]
fn test_second_claim_at_same_instant_gets_nothing() {
    let (_dir, path) = temp_db();
    let mut a = open(&path);
    let mut b = open(&path);
    seed(&mut a, "https://example.com/", None);

    let policy = ClaimPolicy::default();
    let first = claim_batch(&mut a, &OwnerToken::new("a"), 10, &policy, t0()).unwrap();
    let second = claim_batch(&mut b, &OwnerToken::new("b"), 10, &policy, t0()).unwrap();

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
}

#[test]
fn test_completed_record_eligible_only_after_window() {
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let id = seed(&mut storage, "https://example.com/", None);
    let policy = ClaimPolicy::default();

    let owner = OwnerToken::new("crawler");
    claim_batch(&mut storage, &owner, 10, &policy, t0()).unwrap();
    assert!(storage
        .finalize_success(id, owner.as_str(), &CrawlResults::default(), t0())
        .unwrap());

    let after_1h = claim_batch(
        &mut storage,
        &OwnerToken::new("early"),
        10,
        &policy,
        t0() + Duration::hours(1),
    )
    .unwrap();
    assert!(after_1h.is_empty());

    let after_49h = claim_batch(
        &mut storage,
        &OwnerToken::new("late"),
        10,
        &policy,
        t0() + Duration::hours(49),
    )
    .unwrap();
    assert_eq!(after_49h.len(), 1);
    assert_eq!(after_49h[0].id, id);
    assert_eq!(storage.get_url(id).unwrap().status, UrlStatus::Processing);
}

#[test]
fn test_errored_record_is_retried_after_window() {
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let id = seed(&mut storage, "https://example.com/", None);
    let policy = ClaimPolicy::default();

    let owner = OwnerToken::new("crawler");
    claim_batch(&mut storage, &owner, 10, &policy, t0()).unwrap();
    storage
        .finalize_failure(id, owner.as_str(), "HTTP 500", Some(500), t0())
        .unwrap();

    let retry = claim_batch(
        &mut storage,
        &OwnerToken::new("retry"),
        10,
        &policy,
        t0() + Duration::hours(49),
    )
    .unwrap();
    assert_eq!(retry.len(), 1);
}

#[test]
fn test_concurrent_discovery_of_one_link_creates_one_record() {
    let (_dir, path) = temp_db();
    let workers = 2;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|i| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut storage = open(&path);
                let source = ClaimedUrl {
                    id: i as i64 + 100,
                    url: format!("https://example.com/source/{}", i),
                    domain_id: None,
                    locked_by: format!("worker-{}", i),
                };
                let found = ExtractedLinks {
                    internal: vec![normalize_url("https://example.com/shared").unwrap()],
                    external: Vec::new(),
                };
                barrier.wait();
                store_discovered_links(&mut storage, &source, &found, true, t0()).unwrap()
            })
        })
        .collect();

    let reports: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(reports.iter().map(|r| r.created).sum::<usize>(), 1);
    assert_eq!(reports.iter().map(|r| r.existing).sum::<usize>(), 1);

    let storage = open(&path);
    assert_eq!(storage.count_total_urls().unwrap(), 1);
    assert!(storage
        .get_url_by_fingerprint(&fingerprint("https://example.com/shared"))
        .unwrap()
        .is_some());
}
