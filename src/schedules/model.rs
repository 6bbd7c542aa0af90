use crate::auth::OwnerId;
use crate::crawler::{CrawlRequest, SeedPolicy};
use crate::state::ScheduleStatus;
use crate::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Shortest allowed schedule interval, in minutes
pub const MIN_INTERVAL_MINUTES: u32 = 5;

/// Longest allowed schedule interval, in minutes (one day)
pub const MAX_INTERVAL_MINUTES: u32 = 1440;

fn default_interval_minutes() -> u32 {
    60
}

/// A crawl template plus the interval it should repeat at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    #[serde(flatten)]
    pub crawl: CrawlRequest,

    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,
}

impl ScheduleRequest {
    pub fn new(crawl: CrawlRequest, interval_minutes: u32) -> Self {
        Self {
            crawl,
            interval_minutes,
        }
    }

    /// Checks the crawl template and the interval bounds
    ///
    /// Seeds are always required here: a schedule with nothing to crawl is rejected.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let crawl = self.crawl.validate(SeedPolicy::Required)?;

        if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&self.interval_minutes) {
            return Err(ValidationError::Interval {
                min: MIN_INTERVAL_MINUTES,
                max: MAX_INTERVAL_MINUTES,
                got: self.interval_minutes,
            });
        }

        Ok(Self {
            crawl,
            interval_minutes: self.interval_minutes,
        })
    }
}

/// A recurring crawl owned by one account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub schedule_id: Uuid,
    pub owner: OwnerId,
    pub payload: CrawlRequest,
    pub interval_minutes: u32,
    pub created_at: DateTime<Utc>,
    pub status: ScheduleStatus,
}

impl Schedule {
    /// Builds an active schedule from an already validated request
    pub fn active(owner: OwnerId, request: ScheduleRequest) -> Self {
        Self {
            schedule_id: Uuid::new_v4(),
            owner,
            payload: request.crawl,
            interval_minutes: request.interval_minutes,
            created_at: Utc::now(),
            status: ScheduleStatus::Active,
        }
    }

    /// Time between firings
    pub fn period(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_minutes) * 60)
    }
}
