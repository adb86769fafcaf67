//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the RecordSink trait.

use crate::crawler::CrawlReport;
use crate::models::{Comment, Note};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordSink, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, keyword, config_hash, started_at, finished_at, status,
                 notes_saved, comments_saved, replies_posted, failures
                 FROM runs WHERE id = ?1",
                params![run_id],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        keyword: row.get(1)?,
                        config_hash: row.get(2)?,
                        started_at: row.get(3)?,
                        finished_at: row.get(4)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
                            .unwrap_or(RunStatus::Running),
                        notes_saved: row.get(6)?,
                        comments_saved: row.get(7)?,
                        replies_posted: row.get(8)?,
                        failures: row.get(9)?,
                    })
                },
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    pub fn count_notes(&self) -> StorageResult<u64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?)
    }

    /// Number of stored comments of a note, replies included
    pub fn count_comments(&self, note_id: &str) -> StorageResult<u64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE note_id = ?1",
            params![note_id],
            |row| row.get(0),
        )?)
    }
}

fn to_json(value: &serde_json::Value) -> StorageResult<String> {
    serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

impl RecordSink for SqliteSink {
    fn begin_run(&mut self, keyword: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (keyword, config_hash, started_at, status) VALUES (?1, ?2, ?3, ?4)",
            params![keyword, config_hash, now, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn save_note(&mut self, run_id: i64, note: &Note) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO notes (note_id, run_id, title, description, note_type, user_id, nickname,
             liked_count, collected_count, comment_count, share_count, time, last_update_time,
             raw, crawled_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(note_id) DO UPDATE SET
                run_id = excluded.run_id,
                title = excluded.title,
                description = excluded.description,
                note_type = excluded.note_type,
                user_id = excluded.user_id,
                nickname = excluded.nickname,
                liked_count = excluded.liked_count,
                collected_count = excluded.collected_count,
                comment_count = excluded.comment_count,
                share_count = excluded.share_count,
                time = excluded.time,
                last_update_time = excluded.last_update_time,
                raw = excluded.raw,
                crawled_at = excluded.crawled_at",
            params![
                note.note_id,
                run_id,
                note.title,
                note.desc,
                note.kind,
                note.author.user_id,
                note.author.nickname,
                note.interact.liked_count as i64,
                note.interact.collected_count as i64,
                note.interact.comment_count as i64,
                note.interact.share_count as i64,
                note.time,
                note.last_update_time,
                to_json(&note.raw)?,
                now
            ],
        )?;
        Ok(())
    }

    fn save_comments(
        &mut self,
        run_id: i64,
        note_id: &str,
        comments: &[Comment],
    ) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO comments (note_id, comment_id, parent_id, run_id, content, user_id,
                 nickname, like_count, create_time, ip_location, sub_comment_count, raw, crawled_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                 ON CONFLICT(note_id, comment_id) DO UPDATE SET
                    parent_id = excluded.parent_id,
                    run_id = excluded.run_id,
                    content = excluded.content,
                    like_count = excluded.like_count,
                    sub_comment_count = excluded.sub_comment_count,
                    raw = excluded.raw,
                    crawled_at = excluded.crawled_at",
            )?;
            for comment in comments {
                stmt.execute(params![
                    note_id,
                    comment.comment_id,
                    comment.parent_id,
                    run_id,
                    comment.content,
                    comment.author.user_id,
                    comment.author.nickname,
                    comment.like_count as i64,
                    comment.create_time,
                    comment.ip_location,
                    comment.sub_comment_count as i64,
                    to_json(&comment.raw)?,
                    now
                ])?;
            }
        }
        tx.commit()?;
        Ok(comments.len())
    }

    fn record_reply(&mut self, run_id: i64, note_id: &str, content: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO replies (run_id, note_id, content, posted_at) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, note_id, content, now],
        )?;
        Ok(())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        report: &CrawlReport,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, notes_saved = ?3, comments_saved = ?4,
             replies_posted = ?5, failures = ?6 WHERE id = ?7",
            params![
                status.to_db_string(),
                now,
                report.notes_saved as i64,
                report.comments_saved as i64,
                report.replies_posted as i64,
                report.total_failures() as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }
}
