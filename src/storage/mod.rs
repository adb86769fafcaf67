//! Storage module for persisting crawl data
//!
//! This module handles everything the crawler writes, including:
//! - SQLite database initialization and schema management
//! - Run tracking with the configuration hash and final counters
//! - Note, comment and reply records
//!
//! Backends implement [`RecordSink`]. The scheduler shares one sink between
//! concurrent tasks through [`SharedSink`].

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::{MemoryRun, MemorySink};
pub use schema::initialize_schema;
pub use sqlite::SqliteSink;
pub use traits::{RecordSink, StorageError, StorageResult};

use std::path::Path;
use std::sync::{Arc, Mutex};

/// A sink shared between the tasks of a crawl
pub type SharedSink = Arc<Mutex<dyn RecordSink + Send>>;

/// Wraps a sink for sharing
pub fn shared<S: RecordSink + Send + 'static>(sink: S) -> SharedSink {
    Arc::new(Mutex::new(sink))
}

/// Runs `f` with exclusive access to the shared sink
pub fn with_sink<T>(
    sink: &SharedSink,
    f: impl FnOnce(&mut (dyn RecordSink + Send)) -> StorageResult<T>,
) -> StorageResult<T> {
    let mut guard = sink.lock().map_err(|_| StorageError::LockPoisoned)?;
    f(&mut *guard)
}

/// Opens or creates the SQLite database at `path`
pub fn open_storage(path: &Path) -> StorageResult<SqliteSink> {
    SqliteSink::new(path)
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub keyword: String,
    pub config_hash: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: RunStatus,
    pub notes_saved: i64,
    pub comments_saved: i64,
    pub replies_posted: i64,
    pub failures: i64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    /// Stopped by cancellation
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
