//! HttpFetcher tests against a mock server

use std::time::Duration;
use tidewater::config::UserAgentConfig;
use tidewater::crawler::{FetchError, Fetcher, HttpFetcher};
use tidewater::storage::RedirectHop;
use url::Url;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(&UserAgentConfig::default(), 5).unwrap()
}

fn url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
}

#[tokio::test]
async fn test_fetch_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>hello</html>"))
        .mount(&server)
        .await;

    let page = fetcher()
        .fetch(&url(&server, "/"), Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(page.http_status, 200);
    assert_eq!(page.content, "<html>hello</html>");
    assert_eq!(page.final_url, url(&server, "/"));
    assert!(page.redirect_chain.is_empty());
}

#[tokio::test]
async fn test_redirects_are_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/middle"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/middle"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
        .mount(&server)
        .await;

    let page = fetcher()
        .fetch(&url(&server, "/old"), Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(page.final_url, url(&server, "/new"));
    assert_eq!(page.content, "moved");
    assert_eq!(
        page.redirect_chain,
        vec![
            RedirectHop {
                url: url(&server, "/old").to_string(),
                status: 301
            },
            RedirectHop {
                url: url(&server, "/middle").to_string(),
                status: 302
            },
        ]
    );
}

#[tokio::test]
async fn test_redirect_loop_is_detected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/b"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/a"))
        .mount(&server)
        .await;

    let result = fetcher()
        .fetch(&url(&server, "/a"), Duration::from_secs(5))
        .await;
    assert!(matches!(result, Err(FetchError::RedirectLoop(_))));
}

#[tokio::test]
async fn test_redirect_limit() {
    let server = MockServer::start().await;
    for i in 0..10 {
        Mock::given(method("GET"))
            .and(path(format!("/hop{}", i)))
            .respond_with(
                ResponseTemplate::new(301).insert_header("Location", format!("/hop{}", i + 1).as_str()),
            )
            .mount(&server)
            .await;
    }

    let result = fetcher()
        .fetch(&url(&server, "/hop0"), Duration::from_secs(5))
        .await;
    assert!(matches!(result, Err(FetchError::TooManyRedirects(5))));
}

#[tokio::test]
async fn test_server_error_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = fetcher()
        .fetch(&url(&server, "/broken"), Duration::from_secs(5))
        .await;

    match result {
        Err(e) => assert_eq!(e.http_status(), Some(503)),
        Ok(_) => panic!("503 must not be treated as success"),
    }
}

#[tokio::test]
async fn test_missing_page_is_a_failure() {
    let server = MockServer::start().await;

    let result = fetcher()
        .fetch(&url(&server, "/nothing-here"), Duration::from_secs(5))
        .await;
    assert!(matches!(result, Err(FetchError::HttpStatus { status: 404, .. })));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let result = fetcher()
        .fetch(&url(&server, "/slow"), Duration::from_millis(200))
        .await;
    assert!(matches!(result, Err(FetchError::Timeout(_))));
}

#[tokio::test]
async fn test_connection_refused_is_reported() {
    // nothing listens on port 9 locally
    let target = Url::parse("http://127.0.0.1:9/").unwrap();
    let result = fetcher().fetch(&target, Duration::from_secs(2)).await;
    assert!(matches!(result, Err(FetchError::Network(_)) | Err(FetchError::Timeout(_))));
}
