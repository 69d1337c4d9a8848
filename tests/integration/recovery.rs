//! Crash recovery and finalize ownership tests

use crate::common::{open, seed, t0, temp_db};
use chrono::Duration;
use tidewater::storage::{CrawlResults, SqliteStorage, Storage};
use tidewater::{claim_batch, ClaimPolicy, OwnerToken, UrlStatus};

#[test]
fn test_abandoned_lock_is_reclaimed_only_after_window() {
    let (_dir, path) = temp_db();
    let mut crashed = open(&path);
    let mut survivor = open(&path);
    let id = seed(&mut crashed, "https://example.com/", None);
    let policy = ClaimPolicy::default();

    // first worker claims and then disappears
    let dead = OwnerToken::new("dead-worker");
    assert_eq!(claim_batch(&mut crashed, &dead, 10, &policy, t0()).unwrap().len(), 1);
    drop(crashed);

    let soon = claim_batch(
        &mut survivor,
        &OwnerToken::new("too-early"),
        10,
        &policy,
        t0() + Duration::hours(1),
    )
    .unwrap();
    assert!(soon.is_empty());

    let rescuer = OwnerToken::new("rescuer");
    let later = claim_batch(
        &mut survivor,
        &rescuer,
        10,
        &policy,
        t0() + Duration::hours(49),
    )
    .unwrap();
    assert_eq!(later.len(), 1);
    assert_eq!(later[0].id, id);
    assert_eq!(later[0].locked_by, "rescuer");

    let record = survivor.get_url(id).unwrap();
    assert_eq!(record.status, UrlStatus::Processing);
    assert_eq!(record.locked_by.as_deref(), Some("rescuer"));
}

#[test]
fn test_stale_owner_cannot_finalize_reclaimed_record() {
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let id = seed(&mut storage, "https://example.com/", None);
    let policy = ClaimPolicy::default();

    let slow = OwnerToken::new("slow");
    claim_batch(&mut storage, &slow, 10, &policy, t0()).unwrap();

    let fast = OwnerToken::new("fast");
    let later = t0() + Duration::hours(49);
    assert_eq!(claim_batch(&mut storage, &fast, 10, &policy, later).unwrap().len(), 1);

    // the slow worker wakes up and tries to finish
    let applied = storage
        .finalize_success(id, slow.as_str(), &CrawlResults::default(), later)
        .unwrap();
    assert!(!applied);

    let record = storage.get_url(id).unwrap();
    assert_eq!(record.status, UrlStatus::Processing);
    assert_eq!(record.locked_by.as_deref(), Some("fast"));

    let applied = storage
        .finalize_failure(id, fast.as_str(), "HTTP 404", Some(404), later)
        .unwrap();
    assert!(applied);
    assert_eq!(storage.get_url(id).unwrap().status, UrlStatus::Error);
}

#[test]
fn test_finalize_after_completion_is_ignored() {
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let id = seed(&mut storage, "https://example.com/", None);

    let owner = OwnerToken::new("w");
    claim_batch(&mut storage, &owner, 10, &ClaimPolicy::default(), t0()).unwrap();
    assert!(storage
        .finalize_success(id, owner.as_str(), &CrawlResults::default(), t0())
        .unwrap());

    // locks are cleared, so a second finalize by the same owner matches nothing
    assert!(!storage
        .finalize_failure(id, owner.as_str(), "late", None, t0())
        .unwrap());
    assert_eq!(storage.get_url(id).unwrap().status, UrlStatus::Completed);
}
