//! Fakes shared by the integration tests
//!
//! None of these talk to a real browser or platform: the signing oracle
//! hashes the request, the surface serves a fixed cookie jar, and the
//! scripted sources replay canned pages while recording what was asked.

#![allow(dead_code)]

use async_trait::async_trait;
use media_crawler::browser::{BrowserSurface, CookieSpec};
use media_crawler::client::{encode_common_header, SignedHeaders, SigningOracle};
use media_crawler::crawler::{CommentSource, NoteApi, SearchSource};
use media_crawler::models::{CommentPage, Cursor, Note, SearchPage, SearchQuery};
use media_crawler::state::{CookieJar, SigningContext};
use media_crawler::storage::{with_sink, MemorySink, SharedSink};
use media_crawler::CrawlerError;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Builds a memory sink and the shared handle the crawler writes through
pub fn memory_sink() -> (Arc<Mutex<MemorySink>>, SharedSink) {
    let sink = Arc::new(Mutex::new(MemorySink::new()));
    let shared: SharedSink = sink.clone();
    (sink, shared)
}

/// A memory sink with one open run for `keyword`, and that run's id
pub fn sink_with_run(keyword: &str) -> (Arc<Mutex<MemorySink>>, SharedSink, i64) {
    let (sink, shared) = memory_sink();
    let run_id = with_sink(&shared, |s| s.begin_run(keyword, "test-hash")).unwrap();
    (sink, shared, run_id)
}

/// Oracle whose signature is the SHA-256 of path and body
#[derive(Default)]
pub struct DigestOracle {
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl DigestOracle {
    pub fn digest(path: &str, body: Option<&str>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(path.as_bytes());
        hasher.update(body.unwrap_or_default().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Every (path, body) pair signed so far
    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SigningOracle for DigestOracle {
    async fn sign(
        &self,
        path: &str,
        body: Option<&str>,
        context: &SigningContext,
    ) -> Result<SignedHeaders, CrawlerError> {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_string(), body.map(str::to_string)));
        let x_s = Self::digest(path, body);
        let x_t = "1700000000000".to_string();
        Ok(SignedHeaders {
            x_s_common: encode_common_header(context, &x_s, &x_t),
            x_s,
            x_t,
            trace_id: "0123456789abcdef".to_string(),
        })
    }
}

/// Logged-in browser page with a fixed cookie jar
pub struct FakeSurface {
    cookies: Mutex<CookieJar>,
    pub cookie_reads: AtomicU32,
    pub visited: Mutex<Vec<String>>,
}

impl FakeSurface {
    pub fn new() -> Self {
        Self {
            cookies: Mutex::new(CookieJar::from_pairs([("a1", "device"), ("webId", "web")])),
            cookie_reads: AtomicU32::new(0),
            visited: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BrowserSurface for FakeSurface {
    async fn navigate(&self, url: &str) -> Result<(), CrawlerError> {
        self.visited.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn cookies(&self) -> Result<CookieJar, CrawlerError> {
        self.cookie_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.cookies.lock().unwrap().clone())
    }

    async fn add_cookie(&self, cookie: &CookieSpec) -> Result<(), CrawlerError> {
        self.cookies
            .lock()
            .unwrap()
            .insert(cookie.name.clone(), cookie.value.clone());
        Ok(())
    }

    async fn attribute(&self, _selector: &str, _name: &str) -> Result<Option<String>, CrawlerError> {
        Ok(None)
    }

    async fn fill(&self, _selector: &str, _value: &str) -> Result<(), CrawlerError> {
        Ok(())
    }

    async fn click(&self, _selector: &str) -> Result<(), CrawlerError> {
        Ok(())
    }

    async fn evaluate(&self, _expression: &str) -> Result<Value, CrawlerError> {
        Ok(Value::String("fingerprint".to_string()))
    }
}

/// Errors the scripted sources can be told to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    DataFetch,
    IpBlocked,
    AuthExpired,
}

impl Failure {
    pub fn to_error(self, path: &str) -> CrawlerError {
        match self {
            Self::DataFetch => CrawlerError::DataFetch {
                path: path.to_string(),
                code: Some(-510001),
                message: "note abnormal".to_string(),
            },
            Self::IpBlocked => CrawlerError::IpBlocked {
                message: "network abnormal".to_string(),
            },
            Self::AuthExpired => CrawlerError::AuthExpired {
                message: "login expired".to_string(),
            },
        }
    }
}

/// A comment payload as the platform sends it
pub fn comment_json(id: &str, sub_count: u64, has_more: bool, cursor: &str, inline: &[&str]) -> Value {
    json!({
        "id": id,
        "content": format!("comment {}", id),
        "like_count": "3",
        "user_info": {"user_id": "u1", "nickname": "nick", "image": ""},
        "sub_comment_count": sub_count.to_string(),
        "sub_comment_has_more": has_more,
        "sub_comment_cursor": cursor,
        "sub_comments": inline
            .iter()
            .map(|reply| json!({"id": reply, "content": format!("reply {}", reply)}))
            .collect::<Vec<_>>()
    })
}

/// Replies `prefix-start` .. `prefix-(start+count-1)`
pub fn replies_json(prefix: &str, start: usize, count: usize) -> Vec<Value> {
    (start..start + count)
        .map(|i| json!({"id": format!("{}-{}", prefix, i), "content": "reply"}))
        .collect()
}

pub fn page_json(comments: Vec<Value>, has_more: bool, cursor: &str) -> Value {
    json!({"comments": comments, "has_more": has_more, "cursor": cursor})
}

/// Search results served page by page
pub struct ScriptedSearch {
    pages: Vec<Value>,
    requests: Mutex<Vec<(u32, String)>>,
}

impl ScriptedSearch {
    pub fn new(pages: Vec<Value>) -> Self {
        Self {
            pages,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// (page, search id) of every request, in order
    pub fn requests(&self) -> Vec<(u32, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchSource for ScriptedSearch {
    async fn search_page(&self, query: &SearchQuery) -> Result<SearchPage, CrawlerError> {
        self.requests
            .lock()
            .unwrap()
            .push((query.page(), query.search_id().to_string()));
        let data = self
            .pages
            .get(query.page() as usize - 1)
            .cloned()
            .unwrap_or_else(|| json!({"has_more": false, "items": []}));
        SearchPage::from_response(&data).map_err(|message| CrawlerError::Decode {
            path: "search".to_string(),
            message,
        })
    }
}

/// Comment pages keyed by scope and cursor token
#[derive(Default)]
pub struct ScriptedComments {
    pages: HashMap<(String, String), Value>,
    requests: Mutex<Vec<(String, String, Option<u32>)>>,
}

impl ScriptedComments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `page` for the top-level chain of `note_id` at `token`
    pub fn top(mut self, note_id: &str, token: &str, page: Value) -> Self {
        self.pages
            .insert((note_id.to_string(), token.to_string()), page);
        self
    }

    /// Serves `page` for the replies of `note_id/comment_id` at `token`
    pub fn sub(mut self, note_id: &str, comment_id: &str, token: &str, page: Value) -> Self {
        self.pages.insert(
            (format!("{}/{}", note_id, comment_id), token.to_string()),
            page,
        );
        self
    }

    /// (scope, token, num) of every request, in order
    pub fn requests(&self) -> Vec<(String, String, Option<u32>)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn sub_requests(&self) -> usize {
        self.requests()
            .iter()
            .filter(|(_, _, num)| num.is_some())
            .count()
    }

    fn serve(&self, cursor: &Cursor, num: Option<u32>) -> Result<CommentPage, CrawlerError> {
        let scope = cursor.scope().to_string();
        self.requests
            .lock()
            .unwrap()
            .push((scope.clone(), cursor.token().to_string(), num));
        let data = self
            .pages
            .get(&(scope.clone(), cursor.token().to_string()))
            .cloned()
            .ok_or_else(|| CrawlerError::DataFetch {
                path: scope,
                code: None,
                message: format!("no page scripted for cursor '{}'", cursor.token()),
            })?;
        CommentPage::from_response(cursor.scope(), data).map_err(|message| CrawlerError::Decode {
            path: "comments".to_string(),
            message,
        })
    }
}

#[async_trait]
impl CommentSource for ScriptedComments {
    async fn comment_page(&self, cursor: &Cursor) -> Result<CommentPage, CrawlerError> {
        self.serve(cursor, None)
    }

    async fn sub_comment_page(&self, cursor: &Cursor, num: u32) -> Result<CommentPage, CrawlerError> {
        self.serve(cursor, Some(num))
    }
}

/// Note endpoints with per-note failures and `comments_per_note` comments each
pub struct FakeNoteApi {
    comments_per_note: usize,
    detail_failures: HashMap<String, Failure>,
    comment_failures: HashMap<String, Failure>,
    reply_failures: HashMap<String, Failure>,
    detail_latency: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    pub details: Mutex<Vec<String>>,
    pub replies: Mutex<Vec<(String, String)>>,
    pub comment_requests: Mutex<Vec<String>>,
}

impl FakeNoteApi {
    pub fn new(comments_per_note: usize) -> Self {
        Self {
            comments_per_note,
            detail_failures: HashMap::new(),
            comment_failures: HashMap::new(),
            reply_failures: HashMap::new(),
            detail_latency: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            details: Mutex::new(Vec::new()),
            replies: Mutex::new(Vec::new()),
            comment_requests: Mutex::new(Vec::new()),
        }
    }

    /// Holds every detail request open for `latency`
    pub fn with_detail_latency(mut self, latency: Duration) -> Self {
        self.detail_latency = latency;
        self
    }

    /// Most detail requests that were in flight at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn fail_detail(mut self, note_id: &str, failure: Failure) -> Self {
        self.detail_failures.insert(note_id.to_string(), failure);
        self
    }

    pub fn fail_comments(mut self, note_id: &str, failure: Failure) -> Self {
        self.comment_failures.insert(note_id.to_string(), failure);
        self
    }

    pub fn fail_reply(mut self, note_id: &str, failure: Failure) -> Self {
        self.reply_failures.insert(note_id.to_string(), failure);
        self
    }

    pub fn commented_notes(&self) -> HashSet<String> {
        self.comment_requests.lock().unwrap().iter().cloned().collect()
    }

    pub fn replied_notes(&self) -> Vec<String> {
        self.replies
            .lock()
            .unwrap()
            .iter()
            .map(|(note, _)| note.clone())
            .collect()
    }
}

#[async_trait]
impl NoteApi for FakeNoteApi {
    async fn note_detail(&self, note_id: &str) -> Result<Note, CrawlerError> {
        self.details.lock().unwrap().push(note_id.to_string());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(self.detail_latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(failure) = self.detail_failures.get(note_id) {
            return Err(failure.to_error("/api/sns/web/v1/feed"));
        }
        Note::from_card(note_id, json!({"title": format!("note {}", note_id), "type": "normal"}))
            .map_err(|message| CrawlerError::Decode {
                path: "feed".to_string(),
                message,
            })
    }

    async fn send_comment(&self, note_id: &str, content: &str) -> Result<(), CrawlerError> {
        if let Some(failure) = self.reply_failures.get(note_id) {
            return Err(failure.to_error("/api/sns/web/v1/comment/post"));
        }
        self.replies
            .lock()
            .unwrap()
            .push((note_id.to_string(), content.to_string()));
        Ok(())
    }
}

#[async_trait]
impl CommentSource for FakeNoteApi {
    async fn comment_page(&self, cursor: &Cursor) -> Result<CommentPage, CrawlerError> {
        let note_id = cursor.scope().note_id().to_string();
        self.comment_requests.lock().unwrap().push(note_id.clone());
        if let Some(failure) = self.comment_failures.get(&note_id) {
            return Err(failure.to_error("/api/sns/web/v2/comment/page"));
        }
        let comments = (0..self.comments_per_note)
            .map(|i| comment_json(&format!("{}-c{}", note_id, i), 0, false, "", &[]))
            .collect();
        CommentPage::from_response(cursor.scope(), page_json(comments, false, "")).map_err(
            |message| CrawlerError::Decode {
                path: "comments".to_string(),
                message,
            },
        )
    }

    async fn sub_comment_page(&self, cursor: &Cursor, _num: u32) -> Result<CommentPage, CrawlerError> {
        Err(CrawlerError::DataFetch {
            path: cursor.scope().to_string(),
            code: None,
            message: "no replies scripted".to_string(),
        })
    }
}
