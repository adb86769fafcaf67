//! End-to-end keyword crawls against a mock platform
//!
//! The browser is replaced by a fixed cookie jar and the signing oracle by
//! a digest, so cookie login runs without Chromium.

use crate::common::{memory_sink, DigestOracle, FakeSurface};
use media_crawler::auth::LoginMode;
use media_crawler::client::{COMMENT_PAGE_PATH, NOTE_FEED_PATH, SEARCH_NOTES_PATH};
use media_crawler::config::Config;
use media_crawler::crawler::{Spider, XhsSpider};
use media_crawler::storage::RunStatus;
use media_crawler::CrawlerError;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer, keywords: &[&str], max_session_rebuilds: u32) -> Config {
    let mut config = Config::default();
    config.keywords = keywords.iter().map(|k| k.to_string()).collect();
    config.login.mode = LoginMode::Cookie;
    config.login.web_session = Some("ws".to_string());
    config.login.settle_delay_ms = 0;
    config.platform.api_host = server.uri();
    config.crawler.crawl_interval_ms = Some(0);
    config.crawler.max_notes = 5;
    config.crawler.max_session_rebuilds = max_session_rebuilds;
    config
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"success": true, "code": 0, "data": data}))
}

fn failure(code: i64, msg: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"success": false, "code": code, "msg": msg}))
}

async fn mount_happy_platform(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(SEARCH_NOTES_PATH))
        .respond_with(ok(json!({
            "has_more": false,
            "items": [{"id": "n1", "model_type": "note"}]
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(NOTE_FEED_PATH))
        .respond_with(ok(json!({
            "items": [{"note_card": {"note_id": "n1", "title": "pour over", "type": "normal"}}]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(COMMENT_PAGE_PATH))
        .respond_with(ok(json!({
            "has_more": false,
            "cursor": "",
            "comments": [{"id": "c1", "content": "nice"}]
        })))
        .mount(server)
        .await;
}

fn spider(config: Config, sink: media_crawler::storage::SharedSink) -> XhsSpider {
    spider_on(Arc::new(FakeSurface::new()), config, sink)
}

fn spider_on(
    surface: Arc<FakeSurface>,
    config: Config,
    sink: media_crawler::storage::SharedSink,
) -> XhsSpider {
    XhsSpider::new(config, "test-hash", sink)
        .with_surface(surface)
        .with_signing_oracle(Arc::new(DigestOracle::default()))
}

#[tokio::test]
async fn test_keyword_crawl_end_to_end() {
    let server = MockServer::start().await;
    mount_happy_platform(&server).await;
    let (memory, sink) = memory_sink();

    let reports = spider(test_config(&server, &["coffee"], 0), sink)
        .run()
        .await
        .expect("crawl should succeed");

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].notes_found, 1);
    assert_eq!(reports[0].notes_saved, 1);
    assert_eq!(reports[0].comments_saved, 1);

    let memory = memory.lock().unwrap();
    assert_eq!(memory.note("n1").map(|n| n.title.as_str()), Some("pour over"));
    assert_eq!(memory.runs()[0].status, RunStatus::Completed);
    assert_eq!(memory.runs()[0].config_hash, "test-hash");
}

#[tokio::test]
async fn test_expired_session_is_rebuilt() {
    let server = MockServer::start().await;
    // Mounted first so it answers the first detail request only
    Mock::given(method("POST"))
        .and(path(NOTE_FEED_PATH))
        .respond_with(failure(-100, "login expired"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_happy_platform(&server).await;
    let (memory, sink) = memory_sink();
    let surface = Arc::new(FakeSurface::new());
    let config = test_config(&server, &["coffee"], 1);
    let index_url = config.platform.index_url.clone();

    let reports = spider_on(surface.clone(), config, sink)
        .run()
        .await
        .expect("crawl should recover");

    assert_eq!(*surface.visited.lock().unwrap(), vec![index_url]);
    assert_eq!(reports[0].session_rebuilds, 1);
    assert_eq!(reports[0].notes_saved, 1);
    assert_eq!(reports[0].comments_saved, 1);

    let memory = memory.lock().unwrap();
    assert_eq!(memory.runs().len(), 1);
    assert_eq!(memory.runs()[0].status, RunStatus::Completed);
}

#[tokio::test]
async fn test_default_budget_rebuilds_expired_session_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(NOTE_FEED_PATH))
        .respond_with(failure(-100, "login expired"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_happy_platform(&server).await;
    let (memory, sink) = memory_sink();
    let surface = Arc::new(FakeSurface::new());
    let default_budget = Config::default().crawler.max_session_rebuilds;
    let config = test_config(&server, &["coffee"], default_budget);

    let reports = spider_on(surface.clone(), config, sink)
        .run()
        .await
        .expect("default config should log in again");

    assert_eq!(surface.visited.lock().unwrap().len(), 1);
    assert_eq!(reports[0].session_rebuilds, 1);
    assert_eq!(reports[0].notes_saved, 1);
    assert_eq!(memory.lock().unwrap().runs()[0].status, RunStatus::Completed);
}

#[tokio::test]
async fn test_expired_session_without_rebuild_budget_fails_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(NOTE_FEED_PATH))
        .respond_with(failure(-100, "login expired"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_happy_platform(&server).await;
    let (memory, sink) = memory_sink();

    let err = spider(test_config(&server, &["coffee"], 0), sink)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlerError::AuthExpired { .. }));
    assert_eq!(memory.lock().unwrap().runs()[0].status, RunStatus::Failed);
}

#[tokio::test]
async fn test_ip_block_stops_all_keywords() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_NOTES_PATH))
        .respond_with(failure(300012, "network abnormal"))
        .mount(&server)
        .await;
    let (memory, sink) = memory_sink();

    let err = spider(test_config(&server, &["coffee", "tea"], 3), sink)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlerError::IpBlocked { .. }));
    let memory = memory.lock().unwrap();
    assert_eq!(memory.runs().len(), 1);
    assert_eq!(memory.runs()[0].status, RunStatus::Failed);
}

#[tokio::test]
async fn test_failed_search_skips_keyword() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_NOTES_PATH))
        .and(body_string_contains("coffee"))
        .respond_with(failure(-1, "search unavailable"))
        .mount(&server)
        .await;
    mount_happy_platform(&server).await;
    let (memory, sink) = memory_sink();

    let reports = spider(test_config(&server, &["coffee", "tea"], 0), sink)
        .run()
        .await
        .expect("recoverable failures do not stop the run");

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].keyword, "tea");

    let memory = memory.lock().unwrap();
    assert_eq!(memory.runs().len(), 2);
    assert_eq!(memory.runs()[0].status, RunStatus::Failed);
    assert_eq!(memory.runs()[1].status, RunStatus::Completed);
}
