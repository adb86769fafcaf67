use crate::models::cursor::{Cursor, CursorScope};
use crate::models::note::deserialize_count;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommentAuthor {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    #[serde(default)]
    id: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    user_info: CommentAuthor,
    #[serde(default, deserialize_with = "deserialize_count")]
    like_count: u64,
    #[serde(default)]
    create_time: Option<i64>,
    #[serde(default)]
    ip_location: Option<String>,
    #[serde(default, deserialize_with = "deserialize_count")]
    sub_comment_count: u64,
    #[serde(default)]
    sub_comment_has_more: bool,
    #[serde(default)]
    sub_comment_cursor: Option<String>,
    #[serde(default)]
    sub_comments: Vec<Value>,
}

/// One comment of a note's two-level comment tree
///
/// Top-level comments have no parent; replies point at their top-level comment.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub comment_id: String,
    pub note_id: String,
    pub parent_id: Option<String>,
    pub content: String,
    pub author: CommentAuthor,
    pub like_count: u64,
    pub create_time: Option<i64>,
    pub ip_location: Option<String>,
    /// Number of replies the platform says exist
    pub sub_comment_count: u64,
    pub sub_comment_has_more: bool,
    /// Cursor of the first reply page not inlined in this comment
    pub sub_comment_cursor: Option<String>,
    /// Replies delivered inline with this comment
    pub inline_replies: Vec<Comment>,
    pub raw: Value,
}

impl Comment {
    /// Parses a comment object issued within `scope`
    ///
    /// Inline replies are parsed too and attached to this comment.
    pub fn from_value(scope: &CursorScope, value: Value) -> Result<Self, String> {
        let parsed: RawComment =
            serde_json::from_value(value.clone()).map_err(|e| format!("invalid comment: {}", e))?;
        if parsed.id.is_empty() {
            return Err("comment without id".to_string());
        }

        let reply_scope = CursorScope::replies(scope.note_id(), parsed.id.as_str());
        let inline_replies = parsed
            .sub_comments
            .into_iter()
            .map(|reply| Comment::from_value(&reply_scope, reply))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            comment_id: parsed.id,
            note_id: scope.note_id().to_string(),
            parent_id: scope.root_comment_id().map(str::to_string),
            content: parsed.content,
            author: parsed.user_info,
            like_count: parsed.like_count,
            create_time: parsed.create_time,
            ip_location: parsed.ip_location,
            sub_comment_count: parsed.sub_comment_count,
            sub_comment_has_more: parsed.sub_comment_has_more,
            sub_comment_cursor: parsed.sub_comment_cursor.filter(|c| !c.is_empty()),
            inline_replies,
            raw: value,
        })
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Whether replies beyond the inlined ones have to be paged in
    pub fn needs_reply_walk(&self) -> bool {
        self.sub_comment_has_more && (self.inline_replies.len() as u64) < self.sub_comment_count
    }

    /// Cursor that starts this comment's reply chain
    pub fn reply_cursor(&self) -> Cursor {
        let start = Cursor::start(CursorScope::replies(
            self.note_id.as_str(),
            self.comment_id.as_str(),
        ));
        match &self.sub_comment_cursor {
            Some(token) => start.follow(token.as_str()),
            None => start,
        }
    }
}

/// One page of a comment cursor chain
#[derive(Debug, Clone, PartialEq)]
pub struct CommentPage {
    pub comments: Vec<Comment>,
    pub has_more: bool,
    /// Token for the next page, empty when the platform sent none
    pub next_cursor: String,
}

impl CommentPage {
    /// Parses a `{has_more, cursor, comments}` payload issued for `scope`
    pub fn from_response(scope: &CursorScope, data: Value) -> Result<Self, String> {
        let has_more = data.get("has_more").and_then(Value::as_bool).unwrap_or(false);
        let next_cursor = data
            .get("cursor")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let comments = match data.get("comments") {
            Some(Value::Array(items)) => items
                .iter()
                .cloned()
                .map(|item| Comment::from_value(scope, item))
                .collect::<Result<Vec<_>, _>>()?,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => return Err(format!("comments is not a list: {}", other)),
        };
        Ok(Self {
            comments,
            has_more,
            next_cursor,
        })
    }
}
