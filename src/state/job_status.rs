/// Job and schedule status definitions
///
/// A job moves strictly forward: `queued -> running -> completed | failed`.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the lifecycle position of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    // ===== Active States =====
    /// Job has been accepted and is waiting for a worker
    Queued,

    /// A worker is executing the crawl
    Running,

    // ===== Terminal States =====
    /// Crawl finished and its result is attached to the job
    Completed,

    /// Crawl raised an error; the error text is attached to the job
    Failed,
}

impl JobStatus {
    /// Returns true if this is a terminal state (the job will never change again)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true while the job still occupies the queue or a worker
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }

    /// Name used on the wire and in logs; matches the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a recurring schedule
///
/// Schedules are active from creation until deletion; there is no paused state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    #[default]
    Active,
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
        }
    }
}
