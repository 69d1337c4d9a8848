//! End-to-end: seed, claim, fetch, extract, ingest, finalize

use crate::common::{open, parse, temp_db};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tidewater::config::UserAgentConfig;
use tidewater::crawler::{
    FetchError, FetchedPage, Fetcher, HtmlExtractor, HttpFetcher, Worker, WorkerSettings,
};
use tidewater::registry::{seed_domain, seed_url};
use tidewater::storage::{RedirectHop, SqliteStorage, Storage};
use tidewater::{fingerprint, UrlStatus};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves fixed pages without touching the network
struct CannedFetcher {
    pages: HashMap<String, (String, Vec<RedirectHop>, String)>,
}

#[async_trait]
impl Fetcher for CannedFetcher {
    async fn fetch(&self, url: &Url, _timeout: Duration) -> Result<FetchedPage, FetchError> {
        match self.pages.get(url.as_str()) {
            Some((content, chain, final_url)) => Ok(FetchedPage {
                content: content.clone(),
                http_status: 200,
                final_url: parse(final_url),
                redirect_chain: chain.clone(),
            }),
            None => Err(FetchError::Network("connection refused".to_string())),
        }
    }
}

fn worker(storage: SqliteStorage, fetcher: Arc<dyn Fetcher>) -> Worker {
    Worker::new(
        Arc::new(Mutex::new(storage)),
        fetcher,
        Arc::new(HtmlExtractor::new()),
        WorkerSettings::default(),
    )
}

#[tokio::test]
async fn test_seeded_homepage_crawl_queues_internal_link() {
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let seeded = seed_domain(&mut storage, "example.com", None, chrono::Utc::now()).unwrap();

    let mut pages = HashMap::new();
    pages.insert(
        "https://example.com/".to_string(),
        (
            r#"<html><body><a href="/about">About us</a></body></html>"#.to_string(),
            Vec::new(),
            "https://example.com/".to_string(),
        ),
    );
    let worker = worker(storage, Arc::new(CannedFetcher { pages }));

    let report = worker.run_batch().await.unwrap();
    assert_eq!(report.claimed, 1);
    assert_eq!(report.completed, 1);
    assert_eq!(report.links_created, 1);

    let storage = worker.storage();
    let storage = storage.lock().unwrap();

    let homepage = storage.get_url(seeded.homepage_id).unwrap();
    assert_eq!(homepage.status, UrlStatus::Completed);
    assert!(homepage.last_crawled.is_some());
    assert!(homepage.locked_by.is_none());
    assert!(homepage.locked_at.is_none());

    let about = storage
        .get_url_by_fingerprint(&fingerprint("https://example.com/about"))
        .unwrap()
        .expect("/about should be queued");
    assert_eq!(about.status, UrlStatus::Pending);
    assert_eq!(about.domain_id, Some(seeded.domain_id));
}

#[tokio::test]
async fn test_cross_domain_redirect_rescopes_links() {
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let seeded = seed_domain(&mut storage, "old-site.com", None, chrono::Utc::now()).unwrap();

    let mut pages = HashMap::new();
    pages.insert(
        "https://old-site.com/".to_string(),
        (
            r#"<a href="/welcome">hi</a><a href="https://old-site.com/legacy">old</a>"#.to_string(),
            vec![RedirectHop {
                url: "https://old-site.com/".to_string(),
                status: 301,
            }],
            "https://new-site.com/".to_string(),
        ),
    );
    let worker = worker(storage, Arc::new(CannedFetcher { pages }));
    worker.run_batch().await.unwrap();

    let storage = worker.storage();
    let storage = storage.lock().unwrap();

    let homepage = storage.get_url(seeded.homepage_id).unwrap();
    assert_eq!(homepage.final_url.as_deref(), Some("https://new-site.com/"));
    assert_eq!(homepage.redirect_chain.len(), 1);

    // resolved against the final URL, so it lives on the new host
    let welcome = storage
        .get_url_by_fingerprint(&fingerprint("https://new-site.com/welcome"))
        .unwrap()
        .unwrap();
    assert_eq!(welcome.domain_id, None);

    let legacy = storage
        .get_url_by_fingerprint(&fingerprint("https://old-site.com/legacy"))
        .unwrap()
        .unwrap();
    assert_eq!(legacy.domain_id, Some(seeded.domain_id));
}

#[tokio::test]
async fn test_fetch_failure_marks_error_with_reason() {
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let seeded = seed_url(&mut storage, "https://down.example.org/", None, chrono::Utc::now()).unwrap();

    let worker = worker(
        storage,
        Arc::new(CannedFetcher {
            pages: HashMap::new(),
        }),
    );
    let report = worker.run_batch().await.unwrap();
    assert_eq!(report.failed, 1);

    let storage = worker.storage();
    let record = storage.lock().unwrap().get_url(seeded.url_id).unwrap();
    assert_eq!(record.status, UrlStatus::Error);
    assert!(record.error_message.unwrap().contains("connection refused"));
    assert!(record.locked_by.is_none());
}

#[tokio::test]
async fn test_crawl_against_http_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><meta property="og:site_name" content="Mock Co"></head>
               <body>
                 <a href="/about">About</a>
                 <a href="http://localhost:9/page">Elsewhere</a>
                 <p>reach us at team@mock.test</p>
               </body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>about</p>"))
        .mount(&server)
        .await;

    let (_dir, db_path) = temp_db();
    let mut storage = open(&db_path);
    let seeded = seed_url(&mut storage, &format!("{}/", server.uri()), None, chrono::Utc::now()).unwrap();

    let fetcher = HttpFetcher::new(&UserAgentConfig::default(), 10).unwrap();
    let worker = worker(storage, Arc::new(fetcher));

    let first = worker.run_batch().await.unwrap();
    assert_eq!(first.completed, 1);
    assert_eq!(first.links_created, 2);

    // the discovered internal page is crawled by the next batch
    let second = worker.run_batch().await.unwrap();
    assert_eq!(second.claimed, 2);
    assert_eq!(second.completed, 1);
    assert_eq!(second.failed, 1);

    let storage = worker.storage();
    let storage = storage.lock().unwrap();

    let home = storage.get_url(seeded.url_id).unwrap();
    assert_eq!(home.status, UrlStatus::Completed);
    assert_eq!(home.http_status, Some(200));
    assert_eq!(home.emails, vec!["team@mock.test"]);
    assert_eq!(home.organizations, vec!["Mock Co"]);

    let about = storage
        .get_url_by_fingerprint(&fingerprint(&format!("{}/about", server.uri())))
        .unwrap()
        .unwrap();
    assert_eq!(about.status, UrlStatus::Completed);
    assert_eq!(about.domain_id, seeded.domain_id);

    let external = storage
        .get_url_by_fingerprint(&fingerprint("http://localhost:9/page"))
        .unwrap()
        .unwrap();
    assert_eq!(external.status, UrlStatus::Error);
    assert_eq!(external.domain_id, None);
}
