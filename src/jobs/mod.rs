//! Jobs module for background crawl execution
//!
//! # Components
//!
//! - `Job`: One crawl execution with its lifecycle timestamps and outcome
//! - `JobRegistry`: Shared concurrent map of jobs, queried per owner
//! - `JobOrchestrator`: Bounded queue plus worker pool that runs submitted jobs

mod model;
mod orchestrator;
mod registry;

pub use model::Job;
pub use orchestrator::{JobOrchestrator, MAX_LISTED_JOBS};
pub use registry::JobRegistry;
