use crate::auth::OwnerId;
use crate::jobs::Job;
use crate::ShadowError;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Concurrent map of every job this process has accepted
///
/// Cloning shares the same map.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<DashMap<Uuid, Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Job) {
        self.jobs.insert(job.job_id, job);
    }

    /// Returns a snapshot of the job if it exists and belongs to `owner`
    pub fn get_for_owner(&self, job_id: &Uuid, owner: &OwnerId) -> Option<Job> {
        self.jobs
            .get(job_id)
            .filter(|job| &job.owner == owner)
            .map(|job| job.value().clone())
    }

    /// Snapshots of `owner`'s jobs, newest first, at most `limit`
    pub fn list_for_owner(&self, owner: &OwnerId, limit: usize) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .jobs
            .iter()
            .filter(|entry| &entry.owner == owner)
            .map(|entry| entry.value().clone())
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        jobs
    }

    /// Applies `f` to the job in place
    ///
    /// The shard lock is held while `f` runs, so `f` must not await or touch the registry.
    pub fn update<T>(
        &self,
        job_id: &Uuid,
        f: impl FnOnce(&mut Job) -> Result<T, ShadowError>,
    ) -> Result<T, ShadowError> {
        let mut job = self.jobs.get_mut(job_id).ok_or_else(|| ShadowError::NotFound {
            kind: "Job",
            id: job_id.to_string(),
        })?;
        f(&mut job)
    }

    /// True while any job spawned by `schedule_id` is queued or running
    pub fn has_active_for_schedule(&self, schedule_id: &Uuid) -> bool {
        self.jobs
            .iter()
            .any(|entry| entry.schedule_id.as_ref() == Some(schedule_id) && entry.status.is_active())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
