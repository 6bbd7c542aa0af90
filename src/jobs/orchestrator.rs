//! Job orchestrator - accepts crawl submissions and runs them on a worker pool
//!
//! Submissions land in a bounded queue drained by a fixed number of worker tasks.
//! A full queue rejects the submission before any job record exists.

use crate::auth::OwnerId;
use crate::config::JobsConfig;
use crate::crawler::{CrawlExecutor, CrawlRequest, CrawlResult, SeedPolicy};
use crate::jobs::{Job, JobRegistry};
use crate::storage::{audit, record_audit, record_scan, EventSink, SCAN_KIND_WEB_SCRAPE};
use crate::ShadowError;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

/// Most jobs returned by a listing
pub const MAX_LISTED_JOBS: usize = 100;

/// What each worker needs to run a job
struct WorkerContext {
    registry: JobRegistry,
    executor: Arc<dyn CrawlExecutor>,
    events: Arc<dyn EventSink>,
}

/// Accepts, runs and reports on crawl jobs
///
/// Cloning shares the same queue, registry and workers.
#[derive(Clone)]
pub struct JobOrchestrator {
    registry: JobRegistry,
    sender: mpsc::Sender<Uuid>,
    executor: Arc<dyn CrawlExecutor>,
    events: Arc<dyn EventSink>,
    queue_capacity: usize,
}

impl JobOrchestrator {
    /// Starts the worker pool and returns a handle to it
    ///
    /// Must be called from within a tokio runtime. Workers stop once every
    /// handle has been dropped and the queue has drained.
    ///
    /// # Arguments
    ///
    /// * `config` - Worker count and queue capacity
    /// * `executor` - Runs each crawl
    /// * `events` - Receives scan results and audit records
    pub fn start(
        config: &JobsConfig,
        executor: Arc<dyn CrawlExecutor>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let registry = JobRegistry::new();
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let context = Arc::new(WorkerContext {
            registry: registry.clone(),
            executor: Arc::clone(&executor),
            events: Arc::clone(&events),
        });

        for worker_id in 0..config.max_workers.max(1) {
            tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&receiver),
                Arc::clone(&context),
            ));
        }

        tracing::info!(
            "Job orchestrator started with {} worker(s), queue capacity {}",
            config.max_workers,
            config.queue_capacity
        );

        Self {
            registry,
            sender,
            executor,
            events,
            queue_capacity: config.queue_capacity,
        }
    }

    /// Accepts a crawl for background execution
    ///
    /// Returns the new job's id as soon as it is queued; the crawl runs later on a worker.
    ///
    /// # Errors
    ///
    /// * `ShadowError::Validation` - The request is malformed; no job is created
    /// * `ShadowError::Busy` - The queue is full; no job is created
    pub async fn submit(
        &self,
        owner: &OwnerId,
        request: CrawlRequest,
        schedule_id: Option<Uuid>,
    ) -> Result<Uuid, ShadowError> {
        let request = request.validate(SeedPolicy::Optional)?;

        let permit = self.sender.clone().try_reserve_owned().map_err(|e| match e {
            TrySendError::Full(_) => ShadowError::Busy {
                capacity: self.queue_capacity,
            },
            TrySendError::Closed(_) => ShadowError::Execution("job queue is closed".to_string()),
        })?;

        let job = Job::queued(owner.clone(), request, schedule_id);
        let job_id = job.job_id;
        self.registry.insert(job);

        let mut details = json!({ "job_id": job_id });
        if let Some(schedule_id) = schedule_id {
            details["schedule_id"] = json!(schedule_id);
        }

        // The job is registered; it must reach the queue even if the caller is dropped.
        // Audited before sending so queued always precedes completed.
        let events = Arc::clone(&self.events);
        let audited_owner = owner.clone();
        let enqueue = tokio::spawn(async move {
            record_audit(events.as_ref(), audit::JOB_QUEUED, Some(&audited_owner), details).await;
            permit.send(job_id);
        });
        if let Err(e) = enqueue.await {
            tracing::error!("Enqueueing job {} did not finish: {}", job_id, e);
        }

        tracing::info!("Queued job {} for {}", job_id, owner);

        Ok(job_id)
    }

    /// Returns the job if it exists and belongs to `owner`
    ///
    /// Unknown ids and other owners' ids are indistinguishable.
    pub fn get(&self, job_id: &Uuid, owner: &OwnerId) -> Result<Job, ShadowError> {
        self.registry
            .get_for_owner(job_id, owner)
            .ok_or_else(|| ShadowError::NotFound {
                kind: "Job",
                id: job_id.to_string(),
            })
    }

    /// `owner`'s most recent jobs, newest first
    pub fn list(&self, owner: &OwnerId) -> Vec<Job> {
        self.registry.list_for_owner(owner, MAX_LISTED_JOBS)
    }

    /// Runs a crawl on the caller's task and returns its result
    ///
    /// Seeds are required on this path. The result is recorded as a scan event.
    pub async fn run_direct(
        &self,
        owner: &OwnerId,
        request: CrawlRequest,
    ) -> Result<CrawlResult, ShadowError> {
        let request = request.validate(SeedPolicy::Required)?;
        let result = self.executor.execute(&request).await?;

        let payload = serde_json::to_value(&result).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize crawl result: {}", e);
            json!({})
        });
        record_scan(self.events.as_ref(), owner, SCAN_KIND_WEB_SCRAPE, payload).await;
        record_audit(
            self.events.as_ref(),
            audit::SYNC_RUN,
            Some(owner),
            json!({ "pages": result.aggregates.pages_scraped }),
        )
        .await;

        Ok(result)
    }

    /// True while a job spawned by `schedule_id` is queued or running
    pub fn has_active_job_for_schedule(&self, schedule_id: &Uuid) -> bool {
        self.registry.has_active_for_schedule(schedule_id)
    }
}

async fn worker_loop(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Uuid>>>,
    context: Arc<WorkerContext>,
) {
    loop {
        let next = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };

        let Some(job_id) = next else {
            tracing::debug!("Worker {} exiting: queue closed", worker_id);
            break;
        };

        tracing::debug!("Worker {} picked up job {}", worker_id, job_id);
        run_job(&context, job_id).await;
    }
}

/// Drives one job from `queued` to a terminal state
async fn run_job(context: &WorkerContext, job_id: Uuid) {
    let started = context.registry.update(&job_id, |job| {
        job.start()?;
        Ok((job.owner.clone(), job.payload.clone()))
    });

    let (owner, payload) = match started {
        Ok(started) => started,
        Err(e) => {
            tracing::error!("Job {} could not start: {}", job_id, e);
            return;
        }
    };

    tracing::info!("Job {} running", job_id);

    // A panicking crawl must still leave the job in a terminal state
    let executor = Arc::clone(&context.executor);
    let outcome = tokio::spawn(async move { executor.execute(&payload).await }).await;

    let outcome = match outcome {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(e.to_string()),
        Err(join_error) if join_error.is_panic() => Err("crawl task panicked".to_string()),
        Err(join_error) => Err(format!("crawl task did not finish: {}", join_error)),
    };

    match outcome {
        Ok(result) => {
            let payload = serde_json::to_value(&result).unwrap_or_else(|e| {
                tracing::error!("Failed to serialize result of job {}: {}", job_id, e);
                json!({})
            });

            if let Err(e) = context.registry.update(&job_id, |job| job.complete(result)) {
                tracing::error!("Job {} could not complete: {}", job_id, e);
                return;
            }

            tracing::info!("Job {} completed", job_id);
            record_scan(context.events.as_ref(), &owner, SCAN_KIND_WEB_SCRAPE, payload).await;
            record_audit(
                context.events.as_ref(),
                audit::JOB_COMPLETED,
                Some(&owner),
                json!({ "job_id": job_id }),
            )
            .await;
        }
        Err(error) => {
            tracing::warn!("Job {} failed: {}", job_id, error);

            if let Err(e) = context.registry.update(&job_id, |job| job.fail(error.clone())) {
                tracing::error!("Job {} could not be marked failed: {}", job_id, e);
                return;
            }

            record_audit(
                context.events.as_ref(),
                audit::JOB_FAILED,
                Some(&owner),
                json!({ "job_id": job_id, "error": error }),
            )
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{CrawlAggregates, CrawlStatus};
    use crate::state::JobStatus;
    use crate::storage::{MemoryEventStore, StorageResult};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn empty_result(request: &CrawlRequest) -> CrawlResult {
        CrawlResult {
            seed_urls: request.seed_urls.clone(),
            pages: Vec::new(),
            aggregates: CrawlAggregates {
                pages_scraped: 0,
                unique_links: 0,
                emails_found: Vec::new(),
                keyword_totals: BTreeMap::new(),
            },
            status: CrawlStatus::Scraped,
        }
    }

    struct InstantExecutor;

    #[async_trait]
    impl CrawlExecutor for InstantExecutor {
        async fn execute(&self, request: &CrawlRequest) -> crate::Result<CrawlResult> {
            Ok(empty_result(request))
        }
    }

    struct FailingExecutor;

    #[async_trait]
    impl CrawlExecutor for FailingExecutor {
        async fn execute(&self, _request: &CrawlRequest) -> crate::Result<CrawlResult> {
            Err(ShadowError::Execution("upstream exploded".to_string()))
        }
    }

    struct PanickingExecutor;

    #[async_trait]
    impl CrawlExecutor for PanickingExecutor {
        async fn execute(&self, _request: &CrawlRequest) -> crate::Result<CrawlResult> {
            panic!("parser bug");
        }
    }

    /// Blocks every crawl until released
    struct GatedExecutor {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl CrawlExecutor for GatedExecutor {
        async fn execute(&self, request: &CrawlRequest) -> crate::Result<CrawlResult> {
            self.gate.notified().await;
            Ok(empty_result(request))
        }
    }

    /// Audit writes take a while, like a busy database
    struct SlowAuditSink {
        inner: MemoryEventStore,
        delay: Duration,
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
            tokio::time::sleep(self.delay).await;
            self.inner.record_audit_event(kind, owner, details).await
        }
    }

    fn config(max_workers: usize, queue_capacity: usize) -> JobsConfig {
        JobsConfig {
            max_workers,
            queue_capacity,
        }
    }

    fn owner() -> OwnerId {
        OwnerId::new("analyst@example.com")
    }

    fn request() -> CrawlRequest {
        CrawlRequest::new(["https://example.com"]).with_max_pages(1)
    }

    async fn wait_for_terminal(orchestrator: &JobOrchestrator, job_id: &Uuid) -> Job {
        for _ in 0..200 {
            let job = orchestrator.get(job_id, &owner()).unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never finished", job_id);
    }

    #[tokio::test]
    async fn test_submit_returns_queued_job() {
        let gate = Arc::new(Notify::new());
        let events = Arc::new(MemoryEventStore::new());
        let orchestrator = JobOrchestrator::start(
            &config(1, 4),
            Arc::new(GatedExecutor { gate: gate.clone() }),
            events.clone(),
        );

        let job_id = orchestrator.submit(&owner(), request(), None).await.unwrap();
        let job = orchestrator.get(&job_id, &owner()).unwrap();
        assert!(matches!(job.status, JobStatus::Queued | JobStatus::Running));
        assert!(job.finished_at.is_none());
        assert_eq!(events.audit_kinds(), vec![audit::JOB_QUEUED.to_string()]);

        gate.notify_one();
        let job = wait_for_terminal(&orchestrator, &job_id).await;
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_submit_still_runs_job() {
        let sink = Arc::new(SlowAuditSink {
            inner: MemoryEventStore::new(),
            delay: Duration::from_millis(100),
        });
        let orchestrator =
            JobOrchestrator::start(&config(1, 4), Arc::new(InstantExecutor), sink.clone());

        // The caller gives up while the queued audit is still being written
        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            orchestrator.submit(&owner(), request(), None),
        )
        .await;
        assert!(abandoned.is_err());

        let jobs = orchestrator.list(&owner());
        assert_eq!(jobs.len(), 1);
        let job = wait_for_terminal(&orchestrator, &jobs[0].job_id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(
            sink.inner.audit_kinds().first(),
            Some(&audit::JOB_QUEUED.to_string())
        );
    }

    #[tokio::test]
    async fn test_completed_job_records_events() {
        let events = Arc::new(MemoryEventStore::new());
        let orchestrator =
            JobOrchestrator::start(&config(2, 8), Arc::new(InstantExecutor), events.clone());

        let job_id = orchestrator.submit(&owner(), request(), None).await.unwrap();
        let job = wait_for_terminal(&orchestrator, &job_id).await;

        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.result.is_some());
        assert!(job.started_at.is_some());
        assert!(job.finished_at >= job.started_at);

        // Events are written right after the terminal transition
        tokio::time::sleep(Duration::from_millis(50)).await;
        let kinds: Vec<String> = events.events().iter().map(|e| e.kind().to_string()).collect();
        assert_eq!(
            kinds,
            vec![
                audit::JOB_QUEUED.to_string(),
                SCAN_KIND_WEB_SCRAPE.to_string(),
                audit::JOB_COMPLETED.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_executor_error_marks_job_failed() {
        let events = Arc::new(MemoryEventStore::new());
        let orchestrator =
            JobOrchestrator::start(&config(1, 4), Arc::new(FailingExecutor), events.clone());

        let job_id = orchestrator.submit(&owner(), request(), None).await.unwrap();
        let job = wait_for_terminal(&orchestrator, &job_id).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().contains("upstream exploded"));
        assert!(job.result.is_none());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(events.audit_kinds().contains(&audit::JOB_FAILED.to_string()));
    }

    #[tokio::test]
    async fn test_executor_panic_marks_job_failed() {
        let orchestrator = JobOrchestrator::start(
            &config(1, 4),
            Arc::new(PanickingExecutor),
            Arc::new(MemoryEventStore::new()),
        );

        let job_id = orchestrator.submit(&owner(), request(), None).await.unwrap();
        let job = wait_for_terminal(&orchestrator, &job_id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("crawl task panicked"));

        // The worker survives and takes the next job
        let next = orchestrator.submit(&owner(), request(), None).await.unwrap();
        assert_eq!(
            wait_for_terminal(&orchestrator, &next).await.status,
            JobStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_full_queue_rejects_without_creating_job() {
        let gate = Arc::new(Notify::new());
        let orchestrator = JobOrchestrator::start(
            &config(1, 1),
            Arc::new(GatedExecutor { gate: gate.clone() }),
            Arc::new(MemoryEventStore::new()),
        );

        // First job occupies the worker, second fills the queue
        orchestrator.submit(&owner(), request(), None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        orchestrator.submit(&owner(), request(), None).await.unwrap();

        let err = orchestrator.submit(&owner(), request(), None).await.unwrap_err();
        assert!(matches!(err, ShadowError::Busy { capacity: 1 }));
        assert_eq!(orchestrator.list(&owner()).len(), 2);

        gate.notify_waiters();
    }

    #[tokio::test]
    async fn test_invalid_request_creates_no_job() {
        let orchestrator = JobOrchestrator::start(
            &config(1, 4),
            Arc::new(InstantExecutor),
            Arc::new(MemoryEventStore::new()),
        );

        let err = orchestrator
            .submit(&owner(), CrawlRequest::new(["not-a-url"]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ShadowError::Validation(_)));
        assert!(orchestrator.list(&owner()).is_empty());
    }

    #[tokio::test]
    async fn test_empty_seeds_accepted_for_jobs_only() {
        let events = Arc::new(MemoryEventStore::new());
        let orchestrator =
            JobOrchestrator::start(&config(1, 4), Arc::new(InstantExecutor), events.clone());
        let empty = CrawlRequest::new(Vec::<String>::new());

        let job_id = orchestrator.submit(&owner(), empty.clone(), None).await.unwrap();
        assert_eq!(
            wait_for_terminal(&orchestrator, &job_id).await.status,
            JobStatus::Completed
        );

        let err = orchestrator.run_direct(&owner(), empty).await.unwrap_err();
        assert!(matches!(
            err,
            ShadowError::Validation(crate::ValidationError::MissingSeeds)
        ));
    }

    #[tokio::test]
    async fn test_run_direct_records_sync_run() {
        let events = Arc::new(MemoryEventStore::new());
        let orchestrator =
            JobOrchestrator::start(&config(1, 4), Arc::new(InstantExecutor), events.clone());

        let result = orchestrator.run_direct(&owner(), request()).await.unwrap();
        assert_eq!(result.status, CrawlStatus::Scraped);
        assert_eq!(events.audit_kinds(), vec![audit::SYNC_RUN.to_string()]);
        assert!(orchestrator.list(&owner()).is_empty());
    }

    #[tokio::test]
    async fn test_get_hides_foreign_jobs() {
        let orchestrator = JobOrchestrator::start(
            &config(1, 4),
            Arc::new(InstantExecutor),
            Arc::new(MemoryEventStore::new()),
        );

        let job_id = orchestrator.submit(&owner(), request(), None).await.unwrap();
        let intruder = OwnerId::new("intruder@example.com");

        let foreign = orchestrator.get(&job_id, &intruder).unwrap_err();
        let unknown = orchestrator.get(&Uuid::new_v4(), &owner()).unwrap_err();
        assert_eq!(foreign.to_string(), "Job not found");
        assert_eq!(unknown.to_string(), "Job not found");
        assert!(orchestrator.list(&intruder).is_empty());
    }
}
