//! Signed client tests against a mock platform

use crate::common::DigestOracle;
use media_crawler::client::{
    serialize_body, ApiClient, XhsClient, COMMENT_PAGE_PATH, COMMENT_POST_PATH, NOTE_FEED_PATH,
    SEARCH_NOTES_PATH, SUB_COMMENT_PAGE_PATH,
};
use media_crawler::config::PlatformConfig;
use media_crawler::models::{Cursor, CursorScope};
use media_crawler::state::{CookieJar, Session, SigningContext};
use media_crawler::CrawlerError;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_string, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_UA: &str = "Mozilla/5.0 (test)";

fn client_for(server: &MockServer) -> (XhsClient, Arc<DigestOracle>) {
    let config = PlatformConfig {
        api_host: server.uri(),
        index_url: "https://www.xiaohongshu.com".to_string(),
        ..PlatformConfig::default()
    };
    let session = Session::new(
        CookieJar::from_pairs([("a1", "device"), ("web_session", "ws")]),
        SigningContext {
            a1: "device".to_string(),
            b1: "fingerprint".to_string(),
            web_id: None,
        },
    );
    let oracle = Arc::new(DigestOracle::default());
    let api = ApiClient::new(&config, TEST_UA, Arc::new(session), oracle.clone())
        .expect("Failed to build client");
    (XhsClient::new(api), oracle)
}

fn failure(code: i64, msg: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"success": false, "code": code, "msg": msg}))
}

#[tokio::test]
async fn test_post_carries_session_and_signature() {
    let server = MockServer::start().await;
    let body = r#"{"source_note_id":"n1"}"#;
    let signature = DigestOracle::digest(NOTE_FEED_PATH, Some(body));

    Mock::given(method("POST"))
        .and(path(NOTE_FEED_PATH))
        .and(header("cookie", "a1=device;web_session=ws"))
        .and(header("user-agent", TEST_UA))
        .and(header("origin", "https://www.xiaohongshu.com"))
        .and(header("referer", "https://www.xiaohongshu.com"))
        .and(header("x-s", signature.as_str()))
        .and(header("x-t", "1700000000000"))
        .and(header_exists("x-s-common"))
        .and(header_exists("x-b3-traceid"))
        .and(body_string(body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "code": 0,
            "data": {"items": [{"note_card": {"note_id": "n1", "title": "latte art", "type": "normal"}}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, oracle) = client_for(&server);
    let note = client.note_detail("n1").await.expect("detail should succeed");

    assert_eq!(note.note_id, "n1");
    assert_eq!(note.title, "latte art");
    assert_eq!(
        oracle.calls(),
        vec![(NOTE_FEED_PATH.to_string(), Some(body.to_string()))]
    );
}

#[tokio::test]
async fn test_get_signs_path_with_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(COMMENT_PAGE_PATH))
        .and(query_param("note_id", "n1"))
        .and(query_param("cursor", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"has_more": true, "cursor": "next", "comments": [{"id": "c1", "content": "hi"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, oracle) = client_for(&server);
    let page = client
        .comment_page(&Cursor::start(CursorScope::comments("n1")))
        .await
        .expect("comment page should succeed");

    assert!(page.has_more);
    assert_eq!(page.next_cursor, "next");
    assert_eq!(page.comments[0].comment_id, "c1");
    assert_eq!(
        oracle.calls(),
        vec![(format!("{}?note_id=n1&cursor=", COMMENT_PAGE_PATH), None)]
    );
}

#[tokio::test]
async fn test_sub_comment_page_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SUB_COMMENT_PAGE_PATH))
        .and(query_param("note_id", "n1"))
        .and(query_param("root_comment_id", "c1"))
        .and(query_param("num", "30"))
        .and(query_param("cursor", "r10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"has_more": false, "cursor": "", "comments": [{"id": "r11"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_for(&server);
    let cursor = Cursor::start(CursorScope::replies("n1", "c1")).follow("r10");
    let page = client.sub_comment_page(&cursor, 30).await.unwrap();

    assert_eq!(page.comments.len(), 1);
    assert_eq!(page.comments[0].parent_id.as_deref(), Some("c1"));
}

#[tokio::test]
async fn test_cursor_of_other_scope_is_rejected_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, oracle) = client_for(&server);
    let top_level = Cursor::start(CursorScope::comments("n1"));
    let err = client.sub_comment_page(&top_level, 10).await.unwrap_err();
    assert!(matches!(err, CrawlerError::DataFetch { .. }));

    let replies = Cursor::start(CursorScope::replies("n1", "c1"));
    let err = client.comment_page(&replies).await.unwrap_err();
    assert!(matches!(err, CrawlerError::DataFetch { .. }));
    assert!(oracle.calls().is_empty());
}

#[tokio::test]
async fn test_ip_blocked_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_NOTES_PATH))
        .respond_with(failure(300012, "network abnormal"))
        .mount(&server)
        .await;

    let (client, _) = client_for(&server);
    let err = client
        .api()
        .post(SEARCH_NOTES_PATH, &json!({"keyword": "coffee"}))
        .await
        .unwrap_err();
    match err {
        CrawlerError::IpBlocked { message } => assert_eq!(message, "network abnormal"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_expired_session_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(NOTE_FEED_PATH))
        .respond_with(failure(-100, "login expired"))
        .mount(&server)
        .await;

    let (client, _) = client_for(&server);
    let err = client.note_detail("n1").await.unwrap_err();
    assert!(matches!(err, CrawlerError::AuthExpired { .. }));
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn test_other_failure_is_recoverable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(NOTE_FEED_PATH))
        .respond_with(failure(-510001, "note abnormal"))
        .mount(&server)
        .await;

    let (client, _) = client_for(&server);
    let err = client.note_detail("n1").await.unwrap_err();
    match &err {
        CrawlerError::DataFetch { code, message, .. } => {
            assert_eq!(*code, Some(-510001));
            assert_eq!(message, "note abnormal");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_non_json_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(NOTE_FEED_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("<html>busy</html>"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(COMMENT_POST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let (client, _) = client_for(&server);

    let err = client.note_detail("n1").await.unwrap_err();
    assert!(matches!(err, CrawlerError::DataFetch { code: Some(503), .. }));

    let err = client.send_comment("n1", "nice").await.unwrap_err();
    assert!(matches!(err, CrawlerError::Decode { .. }));
}

#[tokio::test]
async fn test_send_comment_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMMENT_POST_PATH))
        .and(body_string(r#"{"note_id":"n1","content":"真不错!!","at_users":[]}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "code": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_for(&server);
    let result = client.send_comment("n1", "真不错!!").await.unwrap();
    assert_eq!(result, json!(true));
}

#[test]
fn test_reordering_keys_changes_signature() {
    #[derive(Serialize)]
    struct NoteFirst<'a> {
        note_id: &'a str,
        content: &'a str,
    }
    #[derive(Serialize)]
    struct ContentFirst<'a> {
        content: &'a str,
        note_id: &'a str,
    }

    let a = serialize_body(COMMENT_POST_PATH, &NoteFirst { note_id: "n1", content: "hi" }).unwrap();
    let b = serialize_body(COMMENT_POST_PATH, &ContentFirst { content: "hi", note_id: "n1" }).unwrap();

    assert_ne!(a, b);
    assert_ne!(
        DigestOracle::digest(COMMENT_POST_PATH, Some(&a)),
        DigestOracle::digest(COMMENT_POST_PATH, Some(&b))
    );
}
