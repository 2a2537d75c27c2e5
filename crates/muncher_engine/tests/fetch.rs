use std::fs;
use std::time::Duration;

use muncher_engine::{AssetFetcher, FailureKind, FetchSettings, ReqwestFetcher};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn fetcher_writes_image_to_destination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maps/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"PNGDATA".to_vec(), "image/png"))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let destination = tmp.path().join("a.png");
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let url = format!("{}/maps/a.png", server.uri());

    let written = fetcher.fetch(&url, &destination, TIMEOUT).await.expect("fetch ok");

    assert_eq!(written, 7);
    assert_eq!(fs::read(&destination).unwrap(), b"PNGDATA");
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let destination = tmp.path().join("missing.png");
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let url = format!("{}/missing.png", server.uri());

    let err = fetcher.fetch(&url, &destination, TIMEOUT).await.unwrap_err();

    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert!(!destination.exists());
}

#[tokio::test]
async fn fetcher_times_out_slow_responses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"late".to_vec(), "image/png")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let url = format!("{}/slow.png", server.uri());

    let err = fetcher
        .fetch(&url, &tmp.path().join("slow.png"), Duration::from_millis(50))
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn fetcher_rejects_oversized_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/huge.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 64], "image/png"))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let destination = tmp.path().join("huge.png");
    let fetcher = ReqwestFetcher::new(FetchSettings {
        max_bytes: 16,
        ..FetchSettings::default()
    });
    let url = format!("{}/huge.png", server.uri());

    let err = fetcher.fetch(&url, &destination, TIMEOUT).await.unwrap_err();

    assert!(matches!(err.kind, FailureKind::TooLarge { max_bytes: 16, .. }));
    assert!(!destination.exists());
}

#[tokio::test]
async fn fetcher_rejects_html_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let url = format!("{}/login", server.uri());

    let err = fetcher
        .fetch(&url, &tmp.path().join("login.png"), TIMEOUT)
        .await
        .unwrap_err();

    assert!(matches!(err.kind, FailureKind::UnsupportedContentType { .. }));
}

#[tokio::test]
async fn invalid_url_is_reported() {
    let tmp = TempDir::new().unwrap();
    let fetcher = ReqwestFetcher::new(FetchSettings::default());

    let err = fetcher
        .fetch("not a url", &tmp.path().join("x.png"), TIMEOUT)
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
