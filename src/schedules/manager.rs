//! Schedule manager - owns recurring crawls and fires them through the job orchestrator

use crate::auth::OwnerId;
use crate::config::OverlapPolicy;
use crate::jobs::JobOrchestrator;
use crate::schedules::{Schedule, ScheduleRequest, Timer, TimerFuture, TimerTask};
use crate::storage::{audit, record_audit, EventSink};
use crate::ShadowError;
use dashmap::DashMap;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// What a firing needs; shared with every timer task
#[derive(Clone)]
struct Dispatcher {
    schedules: Arc<DashMap<Uuid, Schedule>>,
    orchestrator: JobOrchestrator,
    overlap: OverlapPolicy,
}

impl Dispatcher {
    async fn fire(&self, schedule_id: Uuid) {
        // Deleted between the tick and now
        let Some((owner, payload)) = self
            .schedules
            .get(&schedule_id)
            .map(|s| (s.owner.clone(), s.payload.clone()))
        else {
            tracing::debug!("Schedule {} is gone, skipping firing", schedule_id);
            return;
        };

        if self.overlap == OverlapPolicy::Skip
            && self.orchestrator.has_active_job_for_schedule(&schedule_id)
        {
            tracing::info!(
                "Schedule {} still has a job in flight, skipping this firing",
                schedule_id
            );
            return;
        }

        match self
            .orchestrator
            .submit(&owner, payload, Some(schedule_id))
            .await
        {
            Ok(job_id) => tracing::info!("Schedule {} queued job {}", schedule_id, job_id),
            Err(e) => tracing::warn!("Schedule {} could not queue a job: {}", schedule_id, e),
        }
    }
}

/// Creates, lists, deletes and fires recurring crawls
#[derive(Clone)]
pub struct ScheduleManager {
    dispatcher: Dispatcher,
    timer: Arc<dyn Timer>,
    events: Arc<dyn EventSink>,
}

impl ScheduleManager {
    /// Creates a manager that fires through `orchestrator`
    ///
    /// # Arguments
    ///
    /// * `orchestrator` - Submission path for every firing
    /// * `timer` - Source of recurring wake-ups
    /// * `events` - Receives schedule audit records
    /// * `overlap` - Whether a firing may start while an earlier job is still active
    pub fn new(
        orchestrator: JobOrchestrator,
        timer: Arc<dyn Timer>,
        events: Arc<dyn EventSink>,
        overlap: OverlapPolicy,
    ) -> Self {
        Self {
            dispatcher: Dispatcher {
                schedules: Arc::new(DashMap::new()),
                orchestrator,
                overlap,
            },
            timer,
            events,
        }
    }

    /// Validates and registers a recurring crawl
    ///
    /// The first firing happens one full interval after creation.
    pub async fn create(
        &self,
        owner: &OwnerId,
        request: ScheduleRequest,
    ) -> Result<Schedule, ShadowError> {
        let request = request.validate()?;
        let schedule = Schedule::active(owner.clone(), request);
        let schedule_id = schedule.schedule_id;
        let period = schedule.period();

        self.dispatcher
            .schedules
            .insert(schedule_id, schedule.clone());

        let dispatcher = self.dispatcher.clone();
        let task: TimerTask = Arc::new(move || {
            let dispatcher = dispatcher.clone();
            Box::pin(async move { dispatcher.fire(schedule_id).await }) as TimerFuture
        });
        self.timer.schedule_every(schedule_id, period, task);

        tracing::info!(
            "Created schedule {} for {} every {} minute(s)",
            schedule_id,
            owner,
            schedule.interval_minutes
        );

        record_audit(
            self.events.as_ref(),
            audit::SCHEDULE_CREATED,
            Some(owner),
            json!({
                "schedule_id": schedule_id,
                "interval_minutes": schedule.interval_minutes,
            }),
        )
        .await;

        Ok(schedule)
    }

    /// `owner`'s schedules, newest first
    pub fn list(&self, owner: &OwnerId) -> Vec<Schedule> {
        let mut schedules: Vec<Schedule> = self
            .dispatcher
            .schedules
            .iter()
            .filter(|entry| &entry.owner == owner)
            .map(|entry| entry.value().clone())
            .collect();
        schedules.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        schedules
    }

    /// Removes the schedule and stops its timer
    ///
    /// Jobs it already queued keep running.
    ///
    /// # Returns
    ///
    /// * `true` - The schedule existed, belonged to `owner` and is gone
    /// * `false` - Unknown id, or one owned by someone else
    pub async fn delete(&self, schedule_id: &Uuid, owner: &OwnerId) -> bool {
        let removed = self
            .dispatcher
            .schedules
            .remove_if(schedule_id, |_, schedule| &schedule.owner == owner);

        if removed.is_none() {
            return false;
        }

        self.timer.cancel(schedule_id);
        tracing::info!("Deleted schedule {}", schedule_id);

        record_audit(
            self.events.as_ref(),
            audit::SCHEDULE_DELETED,
            Some(owner),
            json!({ "schedule_id": schedule_id }),
        )
        .await;

        true
    }

    /// Runs one firing of `schedule_id` right now
    ///
    /// A no-op for deleted schedules. Timer tasks call the same path.
    pub async fn fire(&self, schedule_id: Uuid) {
        self.dispatcher.fire(schedule_id).await;
    }

    pub fn len(&self) -> usize {
        self.dispatcher.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatcher.schedules.is_empty()
    }
}
