//! Schedules module for recurring crawls
//!
//! A schedule holds a crawl template and an interval. Every firing submits
//! the template as a new job linked back to the schedule.

mod manager;
mod model;
mod timer;

// Re-export main types
pub use manager::ScheduleManager;
pub use model::{Schedule, ScheduleRequest, MAX_INTERVAL_MINUTES, MIN_INTERVAL_MINUTES};
pub use timer::{Timer, TimerFuture, TimerTask, TokioTimer};
