//! Xiaohongshu web API endpoints

use crate::client::api::ApiClient;
use crate::crawler::{CommentSource, NoteApi, SearchSource};
use crate::models::{CommentPage, Cursor, Note, SearchPage, SearchQuery};
use crate::CrawlerError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

pub const SEARCH_NOTES_PATH: &str = "/api/sns/web/v1/search/notes";
pub const NOTE_FEED_PATH: &str = "/api/sns/web/v1/feed";
pub const COMMENT_PAGE_PATH: &str = "/api/sns/web/v2/comment/page";
pub const SUB_COMMENT_PAGE_PATH: &str = "/api/sns/web/v2/comment/sub/page";
pub const COMMENT_POST_PATH: &str = "/api/sns/web/v1/comment/post";

// Field order of the request bodies is part of the signed payload.

#[derive(Serialize)]
struct SearchBody<'a> {
    keyword: &'a str,
    page: u32,
    page_size: u32,
    search_id: &'a str,
    sort: &'a str,
    note_type: u8,
}

#[derive(Serialize)]
struct FeedBody<'a> {
    source_note_id: &'a str,
}

#[derive(Serialize)]
struct CommentBody<'a> {
    note_id: &'a str,
    content: &'a str,
    at_users: [&'a str; 0],
}

/// Typed client for the note, comment and search endpoints
pub struct XhsClient {
    api: ApiClient,
}

impl XhsClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Fetches one page of keyword search results
    pub async fn search_notes(&self, query: &SearchQuery) -> Result<SearchPage, CrawlerError> {
        let body = SearchBody {
            keyword: query.keyword(),
            page: query.page(),
            page_size: query.page_size(),
            search_id: query.search_id(),
            sort: query.sort().as_api_value(),
            note_type: query.note_type().as_api_value(),
        };
        let data = self.api.post(SEARCH_NOTES_PATH, &body).await?;
        SearchPage::from_response(&data).map_err(|message| CrawlerError::Decode {
            path: SEARCH_NOTES_PATH.to_string(),
            message,
        })
    }

    /// Fetches the detail card of a note
    pub async fn note_detail(&self, note_id: &str) -> Result<Note, CrawlerError> {
        let data = self
            .api
            .post(
                NOTE_FEED_PATH,
                &FeedBody {
                    source_note_id: note_id,
                },
            )
            .await?;
        let card = data
            .pointer("/items/0/note_card")
            .cloned()
            .ok_or_else(|| CrawlerError::Decode {
                path: NOTE_FEED_PATH.to_string(),
                message: format!("no note card for {}", note_id),
            })?;
        Note::from_card(note_id, card).map_err(|message| CrawlerError::Decode {
            path: NOTE_FEED_PATH.to_string(),
            message,
        })
    }

    /// Fetches a page of top-level comments
    pub async fn comment_page(&self, cursor: &Cursor) -> Result<CommentPage, CrawlerError> {
        let scope = cursor.scope();
        if scope.is_replies() {
            return Err(scope_mismatch(COMMENT_PAGE_PATH, cursor));
        }
        let params = [
            ("note_id", scope.note_id().to_string()),
            ("cursor", cursor.token().to_string()),
        ];
        let data = self.api.get(COMMENT_PAGE_PATH, &params).await?;
        CommentPage::from_response(scope, data).map_err(|message| CrawlerError::Decode {
            path: COMMENT_PAGE_PATH.to_string(),
            message,
        })
    }

    /// Fetches a page of replies under one top-level comment
    pub async fn sub_comment_page(
        &self,
        cursor: &Cursor,
        num: u32,
    ) -> Result<CommentPage, CrawlerError> {
        let scope = cursor.scope();
        let root_comment_id = scope
            .root_comment_id()
            .ok_or_else(|| scope_mismatch(SUB_COMMENT_PAGE_PATH, cursor))?;
        let params = [
            ("note_id", scope.note_id().to_string()),
            ("root_comment_id", root_comment_id.to_string()),
            ("num", num.to_string()),
            ("cursor", cursor.token().to_string()),
        ];
        let data = self.api.get(SUB_COMMENT_PAGE_PATH, &params).await?;
        CommentPage::from_response(scope, data).map_err(|message| CrawlerError::Decode {
            path: SUB_COMMENT_PAGE_PATH.to_string(),
            message,
        })
    }

    /// Posts a comment on a note
    pub async fn send_comment(&self, note_id: &str, content: &str) -> Result<Value, CrawlerError> {
        let body = CommentBody {
            note_id,
            content,
            at_users: [],
        };
        self.api.post(COMMENT_POST_PATH, &body).await
    }
}

fn scope_mismatch(path: &str, cursor: &Cursor) -> CrawlerError {
    CrawlerError::DataFetch {
        path: path.to_string(),
        code: None,
        message: format!("cursor issued for scope {} cannot be used here", cursor.scope()),
    }
}

#[async_trait]
impl SearchSource for XhsClient {
    async fn search_page(&self, query: &SearchQuery) -> Result<SearchPage, CrawlerError> {
        self.search_notes(query).await
    }
}

#[async_trait]
impl CommentSource for XhsClient {
    async fn comment_page(&self, cursor: &Cursor) -> Result<CommentPage, CrawlerError> {
        XhsClient::comment_page(self, cursor).await
    }

    async fn sub_comment_page(&self, cursor: &Cursor, num: u32) -> Result<CommentPage, CrawlerError> {
        XhsClient::sub_comment_page(self, cursor, num).await
    }
}

#[async_trait]
impl NoteApi for XhsClient {
    async fn note_detail(&self, note_id: &str) -> Result<Note, CrawlerError> {
        XhsClient::note_detail(self, note_id).await
    }

    async fn send_comment(&self, note_id: &str, content: &str) -> Result<(), CrawlerError> {
        XhsClient::send_comment(self, note_id, content).await.map(|_| ())
    }
}
