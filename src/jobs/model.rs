use crate::auth::OwnerId;
use crate::crawler::{CrawlRequest, CrawlResult};
use crate::state::JobStatus;
use crate::ShadowError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One asynchronous execution of a crawl request
///
/// Only the transition methods below change `status`, and each enforces the
/// forward-only lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub owner: OwnerId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub payload: CrawlRequest,
    pub result: Option<CrawlResult>,
    pub error: Option<String>,
    pub schedule_id: Option<Uuid>,
}

impl Job {
    /// Creates a job in `queued` with a fresh id
    pub fn queued(owner: OwnerId, payload: CrawlRequest, schedule_id: Option<Uuid>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            owner,
            status: JobStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            payload,
            result: None,
            error: None,
            schedule_id,
        }
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), ShadowError> {
        if !self.status.can_transition_to(next) {
            return Err(ShadowError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// `queued -> running`
    pub fn start(&mut self) -> Result<(), ShadowError> {
        self.transition(JobStatus::Running)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// `running -> completed`, attaching the crawl result
    pub fn complete(&mut self, result: CrawlResult) -> Result<(), ShadowError> {
        self.transition(JobStatus::Completed)?;
        self.result = Some(result);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// `running -> failed`, attaching the error text
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), ShadowError> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::queued(
            OwnerId::new("owner@example.com"),
            CrawlRequest::new(["https://example.com"]),
            None,
        )
    }

    #[test]
    fn test_queued_job_shape() {
        let job = job();
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.started_at.is_none());
        assert!(job.finished_at.is_none());

        let other = Job::queued(job.owner.clone(), job.payload.clone(), None);
        assert_ne!(job.job_id, other.job_id);
    }

    #[test]
    fn test_failed_lifecycle() {
        let mut job = job();
        job.start().unwrap();
        assert!(job.started_at.is_some());
        assert!(job.finished_at.is_none());

        job.fail("boom").unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("boom"));
        let finished = job.finished_at;
        assert!(finished.is_some());

        // Terminal: nothing moves it again, finished_at stays put
        assert!(job.fail("again").is_err());
        assert!(job.start().is_err());
        assert_eq!(job.finished_at, finished);
        assert_eq!(job.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_cannot_skip_running() {
        let mut job = job();
        let err = job.fail("early").unwrap_err();
        assert!(matches!(
            err,
            ShadowError::InvalidTransition {
                from: JobStatus::Queued,
                to: JobStatus::Failed
            }
        ));
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.finished_at.is_none());
    }

    #[test]
    fn test_serializes_expected_fields() {
        let value = serde_json::to_value(job()).unwrap();
        for field in [
            "job_id",
            "owner",
            "status",
            "created_at",
            "started_at",
            "finished_at",
            "payload",
            "result",
            "error",
            "schedule_id",
        ] {
            assert!(value.get(field).is_some(), "missing {}", field);
        }
        assert_eq!(value["status"], "queued");
    }
}
