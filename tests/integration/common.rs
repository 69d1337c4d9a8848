use chrono::{DateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tidewater::storage::{NewUrl, SqliteStorage, Storage};
use url::Url;

/// Fixed reference time so window arithmetic is exact
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
}

/// Creates an initialized database file and returns its path
pub fn temp_db() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("frontier.db");
    open(&path);
    (dir, path)
}

/// Opens a separate connection, as another worker process would
pub fn open(path: &Path) -> SqliteStorage {
    SqliteStorage::new(path, Duration::from_secs(10)).unwrap()
}

/// Inserts a pending record for an absolute URL
pub fn seed(storage: &mut SqliteStorage, raw: &str, domain_id: Option<i64>) -> i64 {
    let url = tidewater::normalize_url(raw).unwrap();
    let (id, _) = storage
        .insert_url_if_absent(&NewUrl::from_url(&url, domain_id), t0())
        .unwrap();
    id
}

pub fn parse(raw: &str) -> Url {
    Url::parse(raw).unwrap()
}
