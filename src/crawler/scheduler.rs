//! Phase scheduler for per-note work
//!
//! This module handles:
//! - Building one task per note per operation
//! - Running the detail, reply and comment phases in that order
//! - Bounding in-flight tasks with a semaphore
//! - Containing per-item failures and stopping on fatal ones
//!
//! Tasks of a phase are futures joined on the calling task, so a fatal error
//! drops every sibling still in flight and no later phase starts.

use crate::config::{CrawlerConfig, ReplyConfig};
use crate::crawler::pagination::{CommentSource, PaginationEngine};
use crate::crawler::report::CrawlReport;
use crate::crawler::throttle::Throttle;
use crate::models::{CrawlTask, Note, OperationKind};
use crate::storage::{with_sink, SharedSink};
use crate::CrawlerError;
use async_trait::async_trait;
use futures::future::try_join_all;
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Note-level endpoints the scheduler drives
#[async_trait]
pub trait NoteApi: Send + Sync {
    async fn note_detail(&self, note_id: &str) -> Result<Note, CrawlerError>;

    async fn send_comment(&self, note_id: &str, content: &str) -> Result<(), CrawlerError>;
}

/// Reply posted to every crawled note
#[derive(Debug, Clone)]
pub struct ReplyPlan {
    pub content: String,
    /// Pause after each reply
    pub delay: Duration,
}

impl From<&ReplyConfig> for ReplyPlan {
    fn from(config: &ReplyConfig) -> Self {
        Self {
            content: config.content.clone(),
            delay: Duration::from_millis(config.delay_ms),
        }
    }
}

/// Runs the per-note phases of one keyword
pub struct CrawlScheduler {
    semaphore: Semaphore,
    engine: PaginationEngine,
    reply: Option<ReplyPlan>,
    cancel: Option<CancellationToken>,
}

impl CrawlScheduler {
    pub fn new(max_concurrent_tasks: usize, engine: PaginationEngine) -> Self {
        Self {
            semaphore: Semaphore::new(max_concurrent_tasks.max(1)),
            engine,
            reply: None,
            cancel: None,
        }
    }

    /// Builds a scheduler from the crawler settings
    pub fn from_config(config: &CrawlerConfig, reply: Option<&ReplyConfig>) -> Self {
        let mut engine = PaginationEngine::new(
            Throttle::from_config(config),
            config.sub_comment_page_size,
        );
        if !config.fetch_sub_comments {
            engine = engine.without_sub_comments();
        }
        let mut scheduler = Self::new(config.max_concurrent_tasks as usize, engine);
        scheduler.reply = reply.map(ReplyPlan::from);
        scheduler
    }

    pub fn with_reply(mut self, plan: ReplyPlan) -> Self {
        self.reply = Some(plan);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.engine = self.engine.with_cancellation(token.clone());
        self.cancel = Some(token);
        self
    }

    pub fn engine(&self) -> &PaginationEngine {
        &self.engine
    }

    /// One task per note for the given operation
    pub fn plan(note_ids: &[String], kind: OperationKind) -> Vec<CrawlTask> {
        note_ids
            .iter()
            .map(|note_id| CrawlTask::new(note_id.as_str(), kind))
            .collect()
    }

    /// Runs detail, reply and comment phases for `note_ids`
    ///
    /// Only notes whose detail was saved move on to the later phases. Notes in
    /// `replied` are not replied to again; successful replies are added to it.
    pub async fn run<A>(
        &self,
        api: &A,
        sink: &SharedSink,
        run_id: i64,
        note_ids: &[String],
        replied: &mut HashSet<String>,
        report: &mut CrawlReport,
    ) -> Result<(), CrawlerError>
    where
        A: NoteApi + CommentSource + ?Sized,
    {
        let saved = self
            .run_phase(
                Self::plan(note_ids, OperationKind::Detail),
                report,
                move |task| async move {
                    let note = api.note_detail(&task.note_id).await?;
                    with_sink(sink, |s| s.save_note(run_id, &note))?;
                    Ok::<u64, CrawlerError>(1)
                },
            )
            .await?;
        let ready: Vec<String> = note_ids
            .iter()
            .zip(saved)
            .filter(|(_, ok)| *ok)
            .map(|(id, _)| id.clone())
            .collect();

        if let Some(plan) = &self.reply {
            self.reply_phase(api, sink, run_id, &ready, plan, replied, report)
                .await?;
        }

        let engine = &self.engine;
        self.run_phase(
            Self::plan(&ready, OperationKind::Comments),
            report,
            move |task| async move {
                let comments = engine.walk_comments(api, &task.note_id).await?;
                let saved = with_sink(sink, |s| s.save_comments(run_id, &task.note_id, &comments))?;
                info!(note_id = %task.note_id, comments = saved, "Comments saved");
                Ok::<u64, CrawlerError>(saved as u64)
            },
        )
        .await?;

        Ok(())
    }

    /// Runs the tasks of one phase concurrently, at most `max_concurrent_tasks` at a time
    ///
    /// Returns one success flag per task, in task order. Counters are folded
    /// into `report` even when the phase stops on a fatal error.
    async fn run_phase<F, Fut>(
        &self,
        tasks: Vec<CrawlTask>,
        report: &mut CrawlReport,
        op: F,
    ) -> Result<Vec<bool>, CrawlerError>
    where
        F: Fn(CrawlTask) -> Fut,
        Fut: Future<Output = Result<u64, CrawlerError>>,
    {
        let Some(kind) = tasks.first().map(|task| task.kind) else {
            return Ok(Vec::new());
        };
        self.check_cancelled()?;
        info!(phase = %kind, tasks = tasks.len(), "Starting phase");

        let succeeded = AtomicU64::new(0);
        let items = AtomicU64::new(0);
        let failed = AtomicU64::new(0);

        let futures = tasks.into_iter().map(|task| {
            let op = &op;
            let (succeeded, items, failed) = (&succeeded, &items, &failed);
            async move {
                let _permit = self
                    .semaphore
                    .acquire()
                    .await
                    .map_err(|_| CrawlerError::Cancelled)?;
                let note_id = task.note_id.clone();
                match op(task).await {
                    Ok(count) => {
                        succeeded.fetch_add(1, Ordering::Relaxed);
                        items.fetch_add(count, Ordering::Relaxed);
                        Ok(true)
                    }
                    Err(e) if e.is_recoverable() => {
                        warn!(note_id = %note_id, phase = %kind, error = %e, "Task failed, skipping note");
                        failed.fetch_add(1, Ordering::Relaxed);
                        Ok(false)
                    }
                    Err(e) => {
                        error!(note_id = %note_id, phase = %kind, error = %e, "Fatal error, stopping");
                        Err(e)
                    }
                }
            }
        });
        let result = try_join_all(futures).await;

        let succeeded = succeeded.load(Ordering::Relaxed);
        let items = items.load(Ordering::Relaxed);
        let failed = failed.load(Ordering::Relaxed);
        match kind {
            OperationKind::Detail => report.notes_saved += succeeded,
            OperationKind::Reply => report.replies_posted += succeeded,
            OperationKind::Comments => report.comments_saved += items,
        }
        report.add_failures(kind, failed);
        info!(phase = %kind, succeeded, failed, "Phase finished");

        result
    }

    /// Posts replies one at a time, pausing after each
    #[allow(clippy::too_many_arguments)]
    async fn reply_phase<A>(
        &self,
        api: &A,
        sink: &SharedSink,
        run_id: i64,
        ready: &[String],
        plan: &ReplyPlan,
        replied: &mut HashSet<String>,
        report: &mut CrawlReport,
    ) -> Result<(), CrawlerError>
    where
        A: NoteApi + ?Sized,
    {
        let targets: Vec<&String> = ready.iter().filter(|id| !replied.contains(*id)).collect();
        if targets.is_empty() {
            return Ok(());
        }
        info!(phase = %OperationKind::Reply, tasks = targets.len(), "Starting phase");

        for note_id in targets {
            self.check_cancelled()?;
            let task = CrawlTask::new(note_id.as_str(), OperationKind::Reply);
            match api.send_comment(&task.note_id, &plan.content).await {
                Ok(()) => {
                    replied.insert(task.note_id.clone());
                    with_sink(sink, |s| s.record_reply(run_id, &task.note_id, &plan.content))?;
                    report.replies_posted += 1;
                    info!(note_id = %task.note_id, "Reply posted");
                }
                Err(e) if e.is_recoverable() => {
                    warn!(note_id = %task.note_id, error = %e, "Reply failed, skipping note");
                    report.record_failure(OperationKind::Reply);
                }
                Err(e) => {
                    error!(note_id = %task.note_id, error = %e, "Fatal error while replying, stopping");
                    return Err(e);
                }
            }
            if !plan.delay.is_zero() {
                sleep(plan.delay).await;
            }
        }
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), CrawlerError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(CrawlerError::Cancelled),
            _ => Ok(()),
        }
    }
}
