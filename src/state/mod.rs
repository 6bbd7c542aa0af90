//! State module for job and schedule lifecycles
//!
//! # Components
//!
//! - `JobStatus`: Lifecycle of a background crawl job (queued, running, completed, failed)
//! - `ScheduleStatus`: Status of a recurring schedule

mod job_status;

// Re-export main types
pub use job_status::{JobStatus, ScheduleStatus};
