//! Per-keyword run summary

use crate::models::OperationKind;
use std::fmt;

/// Counters collected while crawling one keyword
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub keyword: String,
    /// Note ids returned by search
    pub notes_found: u64,
    pub notes_saved: u64,
    pub comments_saved: u64,
    pub replies_posted: u64,
    pub detail_failures: u64,
    pub reply_failures: u64,
    pub comment_failures: u64,
    /// How many times the session had to be rebuilt
    pub session_rebuilds: u32,
}

impl CrawlReport {
    pub fn new(keyword: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            ..Self::default()
        }
    }

    pub fn record_failure(&mut self, kind: OperationKind) {
        self.add_failures(kind, 1);
    }

    pub fn add_failures(&mut self, kind: OperationKind, count: u64) {
        match kind {
            OperationKind::Detail => self.detail_failures += count,
            OperationKind::Reply => self.reply_failures += count,
            OperationKind::Comments => self.comment_failures += count,
        }
    }

    pub fn failures(&self, kind: OperationKind) -> u64 {
        match kind {
            OperationKind::Detail => self.detail_failures,
            OperationKind::Reply => self.reply_failures,
            OperationKind::Comments => self.comment_failures,
        }
    }

    pub fn total_failures(&self) -> u64 {
        self.detail_failures + self.reply_failures + self.comment_failures
    }

    /// Folds the counters of a restarted attempt into this report
    pub fn absorb(&mut self, other: &CrawlReport) {
        self.notes_found = self.notes_found.max(other.notes_found);
        self.notes_saved += other.notes_saved;
        self.comments_saved += other.comments_saved;
        self.replies_posted += other.replies_posted;
        self.detail_failures += other.detail_failures;
        self.reply_failures += other.reply_failures;
        self.comment_failures += other.comment_failures;
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "keyword '{}': {} notes found, {} saved, {} comments, {} replies, {} failures (detail {}, reply {}, comments {})",
            self.keyword,
            self.notes_found,
            self.notes_saved,
            self.comments_saved,
            self.replies_posted,
            self.total_failures(),
            self.detail_failures,
            self.reply_failures,
            self.comment_failures
        )?;
        if self.session_rebuilds > 0 {
            write!(f, ", {} session rebuild(s)", self.session_rebuilds)?;
        }
        Ok(())
    }
}
