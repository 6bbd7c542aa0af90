use crate::auth::AccountDirectory;
use crate::jobs::JobOrchestrator;
use crate::schedules::ScheduleManager;
use crate::storage::EventSink;
use crate::throttle::{LoginGuard, RateLimiter};
use std::sync::Arc;

/// Shared state injected into every handler via `State<AppState>`
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: JobOrchestrator,
    pub schedules: ScheduleManager,
    pub limiter: Arc<RateLimiter>,
    pub login_guard: Arc<LoginGuard>,
    pub accounts: Arc<AccountDirectory>,
    pub events: Arc<dyn EventSink>,
}

impl AppState {
    /// Whether request counters are shared through an external backend
    pub fn redis_configured(&self) -> bool {
        self.limiter.has_backend()
    }
}
