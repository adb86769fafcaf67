//! Phase scheduling tests with a fake note API and the memory sink

use crate::common::{sink_with_run, Failure, FakeNoteApi};
use media_crawler::crawler::{CrawlReport, CrawlScheduler, PaginationEngine, ReplyPlan, Throttle};
use media_crawler::CrawlerError;
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn scheduler() -> CrawlScheduler {
    CrawlScheduler::new(2, PaginationEngine::new(Throttle::Off, 10))
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn reply_plan() -> ReplyPlan {
    ReplyPlan {
        content: "真不错!!".to_string(),
        delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn test_all_phases_complete() {
    let api = FakeNoteApi::new(2);
    let (memory, sink, run_id) = sink_with_run("coffee");
    let mut report = CrawlReport::new("coffee");
    let mut replied = HashSet::new();

    scheduler()
        .run(&api, &sink, run_id, &ids(&["n1", "n2", "n3"]), &mut replied, &mut report)
        .await
        .unwrap();

    assert_eq!(report.notes_saved, 3);
    assert_eq!(report.comments_saved, 6);
    assert_eq!(report.total_failures(), 0);
    assert_eq!(report.replies_posted, 0);

    let memory = memory.lock().unwrap();
    assert_eq!(memory.note_count(), 3);
    assert_eq!(memory.comment_count(), 6);
    assert_eq!(memory.comments_for("n2").len(), 2);
}

#[tokio::test]
async fn test_data_fetch_failure_is_contained() {
    let api = FakeNoteApi::new(1)
        .fail_detail("n2", Failure::DataFetch)
        .fail_comments("n3", Failure::DataFetch);
    let (memory, sink, run_id) = sink_with_run("coffee");
    let mut report = CrawlReport::new("coffee");
    let mut replied = HashSet::new();

    scheduler()
        .run(&api, &sink, run_id, &ids(&["n1", "n2", "n3"]), &mut replied, &mut report)
        .await
        .unwrap();

    assert_eq!(report.notes_saved, 2);
    assert_eq!(report.detail_failures, 1);
    assert_eq!(report.comment_failures, 1);
    assert_eq!(report.comments_saved, 1);

    // A note without detail never reaches the comment phase
    let commented = api.commented_notes();
    assert!(!commented.contains("n2"));
    assert!(commented.contains("n1"));
    assert!(commented.contains("n3"));

    let memory = memory.lock().unwrap();
    assert!(memory.note("n2").is_none());
    assert_eq!(memory.comments_for("n1").len(), 1);
}

#[tokio::test]
async fn test_ip_block_halts_before_later_phases() {
    let api = FakeNoteApi::new(1).fail_detail("n2", Failure::IpBlocked);
    let (_memory, sink, run_id) = sink_with_run("coffee");
    let mut report = CrawlReport::new("coffee");
    let mut replied = HashSet::new();

    let err = scheduler()
        .with_reply(reply_plan())
        .run(&api, &sink, run_id, &ids(&["n1", "n2", "n3"]), &mut replied, &mut report)
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlerError::IpBlocked { .. }));
    assert!(api.commented_notes().is_empty());
    assert!(api.replied_notes().is_empty());
    assert_eq!(report.comments_saved, 0);
}

#[tokio::test]
async fn test_expired_session_surfaces_from_comment_phase() {
    let api = FakeNoteApi::new(1).fail_comments("n1", Failure::AuthExpired);
    let (_memory, sink, run_id) = sink_with_run("coffee");
    let mut report = CrawlReport::new("coffee");
    let mut replied = HashSet::new();

    let err = CrawlScheduler::new(1, PaginationEngine::new(Throttle::Off, 10))
        .run(&api, &sink, run_id, &ids(&["n1", "n2"]), &mut replied, &mut report)
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlerError::AuthExpired { .. }));
    assert_eq!(report.notes_saved, 2);
}

#[tokio::test]
async fn test_reply_phase_posts_in_order_and_skips_replied() {
    let api = FakeNoteApi::new(0);
    let (memory, sink, run_id) = sink_with_run("coffee");
    let mut report = CrawlReport::new("coffee");
    let mut replied: HashSet<String> = ["n1".to_string()].into_iter().collect();

    scheduler()
        .with_reply(reply_plan())
        .run(&api, &sink, run_id, &ids(&["n1", "n2", "n3"]), &mut replied, &mut report)
        .await
        .unwrap();

    assert_eq!(api.replied_notes(), vec!["n2", "n3"]);
    assert_eq!(report.replies_posted, 2);
    assert_eq!(replied.len(), 3);
    assert_eq!(memory.lock().unwrap().replied_notes(), vec!["n2", "n3"]);
}

#[tokio::test]
async fn test_reply_failure_skips_note() {
    let api = FakeNoteApi::new(0).fail_reply("n1", Failure::DataFetch);
    let (_memory, sink, run_id) = sink_with_run("coffee");
    let mut report = CrawlReport::new("coffee");
    let mut replied = HashSet::new();

    scheduler()
        .with_reply(reply_plan())
        .run(&api, &sink, run_id, &ids(&["n1", "n2"]), &mut replied, &mut report)
        .await
        .unwrap();

    assert_eq!(report.reply_failures, 1);
    assert_eq!(report.replies_posted, 1);
    assert!(!replied.contains("n1"));
    assert!(replied.contains("n2"));
}

#[tokio::test]
async fn test_cancelled_scheduler_starts_no_phase() {
    let token = CancellationToken::new();
    token.cancel();
    let api = FakeNoteApi::new(1);
    let (_memory, sink, run_id) = sink_with_run("coffee");
    let mut report = CrawlReport::new("coffee");
    let mut replied = HashSet::new();

    let err = scheduler()
        .with_cancellation(token)
        .run(&api, &sink, run_id, &ids(&["n1"]), &mut replied, &mut report)
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlerError::Cancelled));
    assert!(api.details.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_no_notes_is_a_no_op() {
    let api = FakeNoteApi::new(1);
    let (_memory, sink, run_id) = sink_with_run("coffee");
    let mut report = CrawlReport::new("coffee");
    let mut replied = HashSet::new();

    scheduler()
        .with_reply(reply_plan())
        .run(&api, &sink, run_id, &[], &mut replied, &mut report)
        .await
        .unwrap();

    assert_eq!(report, CrawlReport::new("coffee"));
}

async fn peak_detail_concurrency(cap: usize, notes: usize) -> (usize, u64) {
    let api = FakeNoteApi::new(0).with_detail_latency(Duration::from_millis(20));
    let (_memory, sink, run_id) = sink_with_run("coffee");
    let mut report = CrawlReport::new("coffee");
    let mut replied = HashSet::new();
    let note_ids: Vec<String> = (0..notes).map(|i| format!("n{}", i)).collect();

    CrawlScheduler::new(cap, PaginationEngine::new(Throttle::Off, 10))
        .run(&api, &sink, run_id, &note_ids, &mut replied, &mut report)
        .await
        .unwrap();

    (api.peak_in_flight(), report.notes_saved)
}

#[tokio::test]
async fn test_single_task_cap_runs_sequentially() {
    let (peak, saved) = peak_detail_concurrency(1, 10).await;
    assert_eq!(peak, 1);
    assert_eq!(saved, 10);
}

#[tokio::test]
async fn test_tasks_run_concurrently_up_to_cap() {
    let (peak, saved) = peak_detail_concurrency(3, 10).await;
    assert_eq!(peak, 3);
    assert_eq!(saved, 10);
}
