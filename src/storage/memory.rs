//! In-process sink that keeps every record in memory

use crate::crawler::CrawlReport;
use crate::models::{Comment, Note};
use crate::storage::traits::{RecordSink, StorageError, StorageResult};
use crate::storage::RunStatus;
use chrono::Utc;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct MemoryRun {
    pub keyword: String,
    pub config_hash: String,
    pub status: RunStatus,
    pub report: Option<CrawlReport>,
}

/// Record sink backed by plain collections
///
/// Notes and comments are keyed by id, so repeated writes replace earlier ones.
#[derive(Debug, Default)]
pub struct MemorySink {
    runs: Vec<MemoryRun>,
    notes: HashMap<String, Note>,
    comments: HashMap<(String, String), Comment>,
    replies: Vec<(String, String, String)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> &[MemoryRun] {
        &self.runs
    }

    pub fn note(&self, note_id: &str) -> Option<&Note> {
        self.notes.get(note_id)
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Comments of one note, in no particular order
    pub fn comments_for(&self, note_id: &str) -> Vec<&Comment> {
        self.comments
            .iter()
            .filter(|((note, _), _)| note == note_id)
            .map(|(_, comment)| comment)
            .collect()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    /// Note ids that received a reply, in posting order
    pub fn replied_notes(&self) -> Vec<&str> {
        self.replies.iter().map(|(note, _, _)| note.as_str()).collect()
    }

    fn run_mut(&mut self, run_id: i64) -> StorageResult<&mut MemoryRun> {
        usize::try_from(run_id - 1)
            .ok()
            .and_then(|index| self.runs.get_mut(index))
            .ok_or(StorageError::RunNotFound(run_id))
    }
}

impl RecordSink for MemorySink {
    fn begin_run(&mut self, keyword: &str, config_hash: &str) -> StorageResult<i64> {
        self.runs.push(MemoryRun {
            keyword: keyword.to_string(),
            config_hash: config_hash.to_string(),
            status: RunStatus::Running,
            report: None,
        });
        Ok(self.runs.len() as i64)
    }

    fn save_note(&mut self, run_id: i64, note: &Note) -> StorageResult<()> {
        self.run_mut(run_id)?;
        self.notes.insert(note.note_id.clone(), note.clone());
        Ok(())
    }

    fn save_comments(
        &mut self,
        run_id: i64,
        note_id: &str,
        comments: &[Comment],
    ) -> StorageResult<usize> {
        self.run_mut(run_id)?;
        for comment in comments {
            self.comments.insert(
                (note_id.to_string(), comment.comment_id.clone()),
                comment.clone(),
            );
        }
        Ok(comments.len())
    }

    fn record_reply(&mut self, run_id: i64, note_id: &str, content: &str) -> StorageResult<()> {
        self.run_mut(run_id)?;
        self.replies.push((
            note_id.to_string(),
            content.to_string(),
            Utc::now().to_rfc3339(),
        ));
        Ok(())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        report: &CrawlReport,
    ) -> StorageResult<()> {
        let run = self.run_mut(run_id)?;
        run.status = status;
        run.report = Some(report.clone());
        Ok(())
    }
}
