//! Database schema definitions
//!
//! This module contains the SQL schema of the Media-Crawler database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs, one per keyword
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    keyword TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    status TEXT NOT NULL,
    notes_saved INTEGER NOT NULL DEFAULT 0,
    comments_saved INTEGER NOT NULL DEFAULT 0,
    replies_posted INTEGER NOT NULL DEFAULT 0,
    failures INTEGER NOT NULL DEFAULT 0
);

-- Notes, upserted by id
CREATE TABLE IF NOT EXISTS notes (
    note_id TEXT PRIMARY KEY,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    note_type TEXT NOT NULL,
    user_id TEXT NOT NULL,
    nickname TEXT NOT NULL,
    liked_count INTEGER NOT NULL,
    collected_count INTEGER NOT NULL,
    comment_count INTEGER NOT NULL,
    share_count INTEGER NOT NULL,
    time INTEGER,
    last_update_time INTEGER,
    raw TEXT NOT NULL,
    crawled_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notes_run ON notes(run_id);

-- Comments and replies, upserted by (note, comment) id
CREATE TABLE IF NOT EXISTS comments (
    note_id TEXT NOT NULL,
    comment_id TEXT NOT NULL,
    parent_id TEXT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    content TEXT NOT NULL,
    user_id TEXT NOT NULL,
    nickname TEXT NOT NULL,
    like_count INTEGER NOT NULL,
    create_time INTEGER,
    ip_location TEXT,
    sub_comment_count INTEGER NOT NULL,
    raw TEXT NOT NULL,
    crawled_at TEXT NOT NULL,
    PRIMARY KEY (note_id, comment_id)
);

CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments(parent_id);

-- Replies posted by the crawler
CREATE TABLE IF NOT EXISTS replies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    note_id TEXT NOT NULL,
    content TEXT NOT NULL,
    posted_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
