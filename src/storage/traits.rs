//! Storage traits and error types
//!
//! This module defines the write-sink interface every backend implements and
//! the associated error types.

use crate::crawler::CrawlReport;
use crate::models::{Comment, Note};
use crate::storage::RunStatus;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Write sink for crawled records
///
/// The crawler only ever writes; records are never read back during a run.
/// Writes are upserts, so a note or comment seen twice is stored once.
pub trait RecordSink {
    /// Opens a run for `keyword` and returns its id
    fn begin_run(&mut self, keyword: &str, config_hash: &str) -> StorageResult<i64>;

    fn save_note(&mut self, run_id: i64, note: &Note) -> StorageResult<()>;

    /// Stores the comments of one note and returns how many were written
    fn save_comments(&mut self, run_id: i64, note_id: &str, comments: &[Comment])
        -> StorageResult<usize>;

    /// Records a reply the crawler posted
    fn record_reply(&mut self, run_id: i64, note_id: &str, content: &str) -> StorageResult<()>;

    /// Closes a run with its final status and counters
    fn finish_run(&mut self, run_id: i64, status: RunStatus, report: &CrawlReport)
        -> StorageResult<()>;
}
