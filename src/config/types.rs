use serde::Deserialize;

/// Main configuration structure for ShadowGraph
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub schedules: SchedulesConfig,
    pub storage: StorageConfig,
    #[serde(default, rename = "account")]
    pub accounts: Vec<AccountEntry>,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address the API binds to
    #[serde(rename = "bind-address", default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// Crawler identification and fetch limits
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Name of the crawler, sent in the User-Agent header
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler, sent in the User-Agent header
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// Per-request timeout for page fetches (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl CrawlerConfig {
    /// Formats the User-Agent string: `Name/Version`
    pub fn user_agent(&self) -> String {
        format!("{}/{}", self.crawler_name, self.crawler_version)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Request throttling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ThrottleConfig {
    /// Optional Redis URL for shared counters; local-only when absent
    #[serde(rename = "redis-url", default)]
    pub redis_url: Option<String>,

    /// Key prefix used in the shared counter store
    #[serde(rename = "redis-prefix", default = "default_redis_prefix")]
    pub redis_prefix: String,

    /// Limit applied to routes without a specific entry
    #[serde(default = "default_route_limit")]
    pub default: LimitEntry,

    /// Route-specific limits
    #[serde(default, rename = "route")]
    pub routes: Vec<RouteLimitEntry>,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            redis_prefix: default_redis_prefix(),
            default: default_route_limit(),
            routes: Vec::new(),
        }
    }
}

/// A `(limit, window)` pair
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimitEntry {
    pub limit: u32,
    #[serde(rename = "window-seconds")]
    pub window_seconds: u64,
}

/// A route-specific limit override
#[derive(Debug, Clone, Deserialize)]
pub struct RouteLimitEntry {
    /// Route identifier (e.g., "login", "scrape-aggregate")
    pub route: String,
    pub limit: u32,
    #[serde(rename = "window-seconds")]
    pub window_seconds: u64,
}

/// Login-failure lockout configuration
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LoginConfig {
    /// Failures within the window that trigger a lock
    #[serde(rename = "max-failures", default = "default_max_failures")]
    pub max_failures: u32,

    /// Failure window and lock duration (seconds)
    #[serde(rename = "lock-window-seconds", default = "default_lock_window")]
    pub lock_window_seconds: u64,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            max_failures: default_max_failures(),
            lock_window_seconds: default_lock_window(),
        }
    }
}

/// Background job worker pool configuration
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct JobsConfig {
    /// Number of crawl jobs that may execute at once
    #[serde(rename = "max-workers", default = "default_max_workers")]
    pub max_workers: usize,

    /// Jobs that may wait for a worker before submissions are rejected
    #[serde(rename = "queue-capacity", default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// What a schedule does when it fires while its previous job is unfinished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPolicy {
    /// Submit a new job regardless
    Allow,
    /// Skip the firing while an earlier job of the schedule is queued or running
    #[default]
    Skip,
}

/// Recurring schedule configuration
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SchedulesConfig {
    #[serde(default)]
    pub overlap: OverlapPolicy,
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite event database
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// A provisioned API account
#[derive(Debug, Clone, Deserialize)]
pub struct AccountEntry {
    pub email: String,

    /// Argon2 hash of the account password in PHC string format
    #[serde(rename = "password-hash")]
    pub password_hash: String,

    /// Bearer token identifying this account on API calls
    pub token: String,
}

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_crawler_name() -> String {
    "ShadowGraphCrawler".to_string()
}

fn default_crawler_version() -> String {
    "1.0".to_string()
}

fn default_request_timeout() -> u64 {
    12
}

fn default_redis_prefix() -> String {
    "shadowgraph:ratelimit".to_string()
}

fn default_route_limit() -> LimitEntry {
    LimitEntry {
        limit: 120,
        window_seconds: 60,
    }
}

fn default_max_failures() -> u32 {
    6
}

fn default_lock_window() -> u64 {
    900
}

fn default_max_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    64
}
