//! ShadowGraph: crawl-and-job orchestration for investigative scans
//!
//! This crate runs bounded breadth-first web crawls on behalf of account owners,
//! either directly or as background jobs, re-runs them on recurring schedules,
//! and throttles inbound requests and failed logins.

pub mod api;
pub mod auth;
pub mod config;
pub mod crawler;
pub mod jobs;
pub mod schedules;
pub mod state;
pub mod storage;
pub mod throttle;
pub mod url;

use thiserror::Error;

/// Main error type for ShadowGraph operations
#[derive(Debug, Error)]
pub enum ShadowError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("{kind} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Job queue is full ({capacity} jobs waiting)")]
    Busy { capacity: usize },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::JobStatus,
        to: state::JobStatus,
    },

    #[error("Crawl execution failed: {0}")]
    Execution(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid route in throttle table: {0}")]
    InvalidRoute(String),
}

/// Rejections raised while checking a crawl or schedule request
///
/// These are always reported synchronously, before any job exists.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Provide at least one seed URL.")]
    MissingSeeds,

    #[error("At most {max} seed URLs are allowed, got {got}")]
    TooManySeeds { max: usize, got: usize },

    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("At most {max} keywords are allowed, got {got}")]
    TooManyKeywords { max: usize, got: usize },

    #[error("max_pages must be between {min} and {max}, got {got}")]
    PageBudget { min: u32, max: u32, got: u32 },

    #[error("interval_minutes must be between {min} and {max}, got {got}")]
    Interval { min: u32, max: u32, got: u32 },
}

/// URL-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for ShadowGraph operations
pub type Result<T> = std::result::Result<T, ShadowError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use auth::OwnerId;
pub use config::Config;
pub use crawler::{CrawlRequest, CrawlResult, Crawler, PageResult};
pub use jobs::{Job, JobOrchestrator};
pub use schedules::{Schedule, ScheduleManager};
pub use state::JobStatus;
pub use throttle::{LoginGuard, RateLimiter};
