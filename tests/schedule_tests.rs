//! Integration tests for recurring schedules
//!
//! Time is paused so intervals of minutes elapse instantly; crawls are stubbed.

use async_trait::async_trait;
use shadowgraph::auth::OwnerId;
use shadowgraph::config::{JobsConfig, OverlapPolicy};
use shadowgraph::crawler::{CrawlAggregates, CrawlExecutor, CrawlRequest, CrawlResult, CrawlStatus};
use shadowgraph::jobs::JobOrchestrator;
use shadowgraph::schedules::{ScheduleManager, ScheduleRequest, TokioTimer};
use serde_json::Value;
use shadowgraph::storage::{audit, EventSink, MemoryEvent, MemoryEventStore, StorageResult};
use shadowgraph::JobStatus;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const MINUTE: Duration = Duration::from_secs(60);

struct InstantExecutor;

#[async_trait]
impl CrawlExecutor for InstantExecutor {
    async fn execute(&self, request: &CrawlRequest) -> shadowgraph::Result<CrawlResult> {
        Ok(CrawlResult {
            seed_urls: request.seed_urls.clone(),
            pages: Vec::new(),
            aggregates: CrawlAggregates {
                pages_scraped: 0,
                unique_links: 0,
                emails_found: Vec::new(),
                keyword_totals: BTreeMap::new(),
            },
            status: CrawlStatus::Scraped,
        })
    }
}

struct HangingExecutor;

#[async_trait]
impl CrawlExecutor for HangingExecutor {
    async fn execute(&self, _request: &CrawlRequest) -> shadowgraph::Result<CrawlResult> {
        std::future::pending().await
    }
}

/// Audit writes that take longer than an impatient caller waits
struct SlowAuditSink {
    inner: MemoryEventStore,
}

#[async_trait]
impl EventSink for SlowAuditSink {
    async fn record_scan_event(
        &self,
        owner: &OwnerId,
        kind: &str,
        payload: &Value,
    ) -> StorageResult<()> {
        self.inner.record_scan_event(owner, kind, payload).await
    }

    async fn record_audit_event(
        &self,
        kind: &str,
        owner: Option<&OwnerId>,
        details: &Value,
    ) -> StorageResult<()> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.inner.record_audit_event(kind, owner, details).await
    }
}

struct Harness {
    orchestrator: JobOrchestrator,
    schedules: ScheduleManager,
    events: Arc<MemoryEventStore>,
}

fn harness(executor: Arc<dyn CrawlExecutor>, overlap: OverlapPolicy) -> Harness {
    let events = Arc::new(MemoryEventStore::new());
    let orchestrator = JobOrchestrator::start(
        &JobsConfig {
            max_workers: 2,
            queue_capacity: 16,
        },
        executor,
        events.clone(),
    );
    let schedules = ScheduleManager::new(
        orchestrator.clone(),
        Arc::new(TokioTimer::new()),
        events.clone(),
        overlap,
    );
    Harness {
        orchestrator,
        schedules,
        events,
    }
}

fn owner() -> OwnerId {
    OwnerId::new("analyst@example.com")
}

fn every(minutes: u32) -> ScheduleRequest {
    ScheduleRequest::new(CrawlRequest::new(["https://example.com"]), minutes)
}

#[tokio::test(start_paused = true)]
async fn test_firing_creates_linked_job_after_one_interval() {
    let h = harness(Arc::new(InstantExecutor), OverlapPolicy::Skip);
    let schedule = h.schedules.create(&owner(), every(5)).await.unwrap();

    tokio::time::sleep(5 * MINUTE - Duration::from_secs(1)).await;
    assert!(h.orchestrator.list(&owner()).is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    let jobs = h.orchestrator.list(&owner());
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].schedule_id, Some(schedule.schedule_id));
    assert_eq!(jobs[0].payload, schedule.payload);

    // Let the worker finish it
    tokio::time::sleep(Duration::from_secs(1)).await;
    let job = h.orchestrator.get(&jobs[0].job_id, &owner()).unwrap();
    assert_eq!(job.status, JobStatus::Completed);

    tokio::time::sleep(5 * MINUTE).await;
    assert_eq!(h.orchestrator.list(&owner()).len(), 2);

    let queued = h
        .events
        .events()
        .into_iter()
        .find_map(|event| match event {
            MemoryEvent::Audit { kind, details, .. } if kind == audit::JOB_QUEUED => Some(details),
            _ => None,
        })
        .unwrap();
    assert_eq!(queued["schedule_id"], schedule.schedule_id.to_string());
}

#[tokio::test(start_paused = true)]
async fn test_deleted_schedule_stops_firing() {
    let h = harness(Arc::new(InstantExecutor), OverlapPolicy::Skip);
    let schedule = h.schedules.create(&owner(), every(5)).await.unwrap();

    tokio::time::sleep(6 * MINUTE).await;
    assert_eq!(h.orchestrator.list(&owner()).len(), 1);

    assert!(h.schedules.delete(&schedule.schedule_id, &owner()).await);
    tokio::time::sleep(60 * MINUTE).await;

    assert_eq!(h.orchestrator.list(&owner()).len(), 1);
    // The job it already produced is untouched
    let job = &h.orchestrator.list(&owner())[0];
    assert_eq!(job.status, JobStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_skip_policy_waits_for_previous_job() {
    let h = harness(Arc::new(HangingExecutor), OverlapPolicy::Skip);
    h.schedules.create(&owner(), every(5)).await.unwrap();

    tokio::time::sleep(16 * MINUTE).await;

    let jobs = h.orchestrator.list(&owner());
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Running);
}

#[tokio::test(start_paused = true)]
async fn test_allow_policy_queues_every_firing() {
    let h = harness(Arc::new(HangingExecutor), OverlapPolicy::Allow);
    h.schedules.create(&owner(), every(5)).await.unwrap();

    tokio::time::sleep(16 * MINUTE).await;

    assert_eq!(h.orchestrator.list(&owner()).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_schedules_fire_independently() {
    let h = harness(Arc::new(InstantExecutor), OverlapPolicy::Skip);
    let fast = h.schedules.create(&owner(), every(5)).await.unwrap();
    let slow = h.schedules.create(&owner(), every(15)).await.unwrap();

    tokio::time::sleep(16 * MINUTE).await;

    let jobs = h.orchestrator.list(&owner());
    let from = |id| jobs.iter().filter(|j| j.schedule_id == Some(id)).count();
    assert_eq!(from(fast.schedule_id), 3);
    assert_eq!(from(slow.schedule_id), 1);
}

#[tokio::test(start_paused = true)]
async fn test_interrupted_firing_does_not_stall_schedule() {
    let sink = Arc::new(SlowAuditSink {
        inner: MemoryEventStore::new(),
    });
    let orchestrator = JobOrchestrator::start(
        &JobsConfig {
            max_workers: 1,
            queue_capacity: 8,
        },
        Arc::new(InstantExecutor),
        sink.clone(),
    );
    let schedules = ScheduleManager::new(
        orchestrator.clone(),
        Arc::new(TokioTimer::new()),
        sink.clone(),
        OverlapPolicy::Skip,
    );
    let schedule = schedules.create(&owner(), every(60)).await.unwrap();

    // Dropped while the firing is still auditing its job
    let interrupted = tokio::time::timeout(
        Duration::from_millis(10),
        schedules.fire(schedule.schedule_id),
    )
    .await;
    assert!(interrupted.is_err());

    for _ in 0..3 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        schedules.fire(schedule.schedule_id).await;
    }
    tokio::time::sleep(Duration::from_secs(1)).await;

    let jobs = orchestrator.list(&owner());
    assert_eq!(jobs.len(), 4);
    assert!(jobs.iter().all(|job| job.status == JobStatus::Completed));
}
