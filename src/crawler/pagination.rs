//! Cursor walkers
//!
//! Two walks are supported:
//! - the flat walk pages through search results 1, 2, 3, ... until the
//!   platform runs out or the item cap is reached
//! - the hierarchical walk follows a note's top-level comment cursor and,
//!   for every comment with more replies than it inlines, that comment's own
//!   reply cursor
//!
//! Every request after the first in a walk waits for the throttle. A cursor is
//! requested at most once per chain; a repeated cursor ends the chain.

use crate::crawler::throttle::Throttle;
use crate::models::{Comment, CommentPage, Cursor, CursorScope, SearchPage, SearchQuery};
use crate::CrawlerError;
use async_trait::async_trait;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Produces pages of search results
#[async_trait]
pub trait SearchSource: Send + Sync {
    async fn search_page(&self, query: &SearchQuery) -> Result<SearchPage, CrawlerError>;
}

/// Produces pages of comments for a cursor
#[async_trait]
pub trait CommentSource: Send + Sync {
    /// Top-level comments; `cursor` must be scoped to a note
    async fn comment_page(&self, cursor: &Cursor) -> Result<CommentPage, CrawlerError>;

    /// Replies of one comment; `cursor` must be scoped to a top-level comment
    async fn sub_comment_page(&self, cursor: &Cursor, num: u32) -> Result<CommentPage, CrawlerError>;
}

/// Tracks which cursors of one chain were already requested
#[derive(Debug)]
pub struct CursorChain {
    scope: CursorScope,
    requested: HashSet<String>,
}

impl CursorChain {
    pub fn new(scope: CursorScope) -> Self {
        Self {
            scope,
            requested: HashSet::new(),
        }
    }

    /// Marks `cursor` as requested
    ///
    /// Returns false if it was requested before or belongs to another chain.
    pub fn claim(&mut self, cursor: &Cursor) -> bool {
        cursor.scope() == &self.scope && self.requested.insert(cursor.token().to_string())
    }

    pub fn requested(&self) -> usize {
        self.requested.len()
    }
}

/// Settings shared by both walks
#[derive(Debug, Clone)]
pub struct PaginationEngine {
    throttle: Throttle,
    sub_page_size: u32,
    fetch_sub_comments: bool,
    cancel: Option<CancellationToken>,
}

impl PaginationEngine {
    pub fn new(throttle: Throttle, sub_page_size: u32) -> Self {
        Self {
            throttle,
            sub_page_size: sub_page_size.max(1),
            fetch_sub_comments: true,
            cancel: None,
        }
    }

    /// Skips replies entirely, keeping only top-level comments
    pub fn without_sub_comments(mut self) -> Self {
        self.fetch_sub_comments = false;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn throttle(&self) -> Throttle {
        self.throttle
    }

    /// Collects up to `max_items` note ids, in result order
    ///
    /// Stops on `has_more == false`, on an empty page, or once the cap is
    /// reached; ids past the cap on the last page are dropped.
    pub async fn walk_search<S>(
        &self,
        source: &S,
        first: SearchQuery,
        max_items: usize,
    ) -> Result<Vec<String>, CrawlerError>
    where
        S: SearchSource + ?Sized,
    {
        let mut pacer = Pacer::new(self);
        let mut seen = HashSet::new();
        let mut note_ids = Vec::new();
        let mut query = first;

        while note_ids.len() < max_items {
            pacer.before_request().await?;
            let page = source.search_page(&query).await?;
            debug!(
                keyword = %query.keyword(),
                page = query.page(),
                items = page.item_count,
                has_more = page.has_more,
                "Search page fetched"
            );
            if page.is_empty() {
                break;
            }

            for id in page.note_ids {
                if note_ids.len() >= max_items {
                    break;
                }
                if seen.insert(id.clone()) {
                    note_ids.push(id);
                }
            }

            if !page.has_more {
                break;
            }
            query = query.next_page();
        }

        Ok(note_ids)
    }

    /// Collects every comment of a note, replies included, each exactly once
    ///
    /// Replies follow the top-level comment they belong to.
    pub async fn walk_comments<S>(&self, source: &S, note_id: &str) -> Result<Vec<Comment>, CrawlerError>
    where
        S: CommentSource + ?Sized,
    {
        let mut pacer = Pacer::new(self);
        let mut collector = Collector::default();
        let scope = CursorScope::comments(note_id);
        let mut chain = CursorChain::new(scope.clone());
        let mut cursor = Cursor::start(scope);

        loop {
            if !chain.claim(&cursor) {
                warn!(note_id = %note_id, cursor = %cursor.token(), "Comment cursor repeated, stopping");
                break;
            }
            pacer.before_request().await?;
            let page = source.comment_page(&cursor).await?;
            debug!(
                note_id = %note_id,
                comments = page.comments.len(),
                has_more = page.has_more,
                "Comment page fetched"
            );

            for mut comment in page.comments {
                let walk = self.fetch_sub_comments && comment.needs_reply_walk();
                let inline = std::mem::take(&mut comment.inline_replies);
                let reply_cursor = comment.reply_cursor();
                let declared = comment.sub_comment_count;
                let inline_count = inline.len() as u64;

                collector.push(comment);
                if !self.fetch_sub_comments {
                    continue;
                }
                for reply in inline {
                    collector.push(reply);
                }
                if walk {
                    self.walk_replies(source, reply_cursor, declared, inline_count, &mut pacer, &mut collector)
                        .await?;
                }
            }

            if !page.has_more {
                break;
            }
            cursor = cursor.follow(page.next_cursor);
        }

        Ok(collector.comments)
    }

    async fn walk_replies<S>(
        &self,
        source: &S,
        mut cursor: Cursor,
        declared: u64,
        already_seen: u64,
        pacer: &mut Pacer<'_>,
        collector: &mut Collector,
    ) -> Result<(), CrawlerError>
    where
        S: CommentSource + ?Sized,
    {
        let mut chain = CursorChain::new(cursor.scope().clone());
        let mut cumulative = already_seen;

        loop {
            if !chain.claim(&cursor) {
                warn!(scope = %cursor.scope(), cursor = %cursor.token(), "Reply cursor repeated, stopping");
                break;
            }
            pacer.before_request().await?;
            let page = source.sub_comment_page(&cursor, self.sub_page_size).await?;
            let returned = page.comments.len();
            cumulative += returned as u64;
            debug!(
                scope = %cursor.scope(),
                replies = returned,
                cumulative,
                declared,
                "Reply page fetched"
            );

            for reply in page.comments {
                collector.push(reply);
            }

            let short_page = returned < self.sub_page_size as usize;
            if !page.has_more || short_page || cumulative >= declared {
                break;
            }
            cursor = cursor.follow(page.next_cursor);
        }

        Ok(())
    }
}

/// Applies the throttle between requests of one walk and honours cancellation
struct Pacer<'a> {
    engine: &'a PaginationEngine,
    started: bool,
}

impl<'a> Pacer<'a> {
    fn new(engine: &'a PaginationEngine) -> Self {
        Self {
            engine,
            started: false,
        }
    }

    async fn before_request(&mut self) -> Result<(), CrawlerError> {
        if self.started {
            match &self.engine.cancel {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => return Err(CrawlerError::Cancelled),
                        _ = self.engine.throttle.wait() => {}
                    }
                }
                None => self.engine.throttle.wait().await,
            }
        }
        self.started = true;
        match &self.engine.cancel {
            Some(token) if token.is_cancelled() => Err(CrawlerError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Keeps comments in emission order, dropping repeated ids
#[derive(Default)]
struct Collector {
    seen: HashSet<String>,
    comments: Vec<Comment>,
}

impl Collector {
    fn push(&mut self, comment: Comment) {
        if self.seen.insert(comment.comment_id.clone()) {
            self.comments.push(comment);
        } else {
            debug!(comment_id = %comment.comment_id, "Duplicate comment skipped");
        }
    }
}
