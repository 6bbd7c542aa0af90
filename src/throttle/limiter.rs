use super::backend::CounterBackend;
use super::route::{RateKey, RateLimit, Route, RouteLimits};
use super::window::SlidingWindow;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// In-process sliding-window limiter
///
/// The map is only locked for the duration of a single check and is never held across an await.
#[derive(Debug, Default)]
pub struct LocalLimiter {
    windows: Mutex<HashMap<RateKey, SlidingWindow>>,
}

impl LocalLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(&self, key: &RateKey, limit: RateLimit) -> bool {
        self.allow_at(key, limit, Instant::now())
    }

    pub fn allow_at(&self, key: &RateKey, limit: RateLimit, now: Instant) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        windows
            .entry(key.clone())
            .or_default()
            .allow_at(now, limit.limit, limit.window)
    }

    /// Removes windows that hold no events younger than `max_window`
    ///
    /// # Returns
    ///
    /// The number of windows removed
    pub fn purge_idle(&self, now: Instant, max_window: Duration) -> usize {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let before = windows.len();
        windows.retain(|_, window| {
            window.prune(now, max_window);
            !window.is_empty()
        });
        before - windows.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Request-rate guard for every inbound route
///
/// Uses the shared counter backend when one is configured, and the local sliding
/// window otherwise. A backend error never rejects a request: the check falls back
/// to the local window for that call.
pub struct RateLimiter {
    limits: RouteLimits,
    local: LocalLimiter,
    backend: Option<Arc<dyn CounterBackend>>,
}

impl RateLimiter {
    pub fn new(limits: RouteLimits) -> Self {
        Self {
            limits,
            local: LocalLimiter::new(),
            backend: None,
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn CounterBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn limits(&self) -> &RouteLimits {
        &self.limits
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Checks and records one request from `client` on `route`
    pub async fn check(&self, route: Route, client: &str) -> bool {
        let key = RateKey::new(route, client);
        let limit = self.limits.limit_for(route);
        self.allow(&key, limit).await
    }

    /// Checks and records one event for `key` under `limit`
    pub async fn allow(&self, key: &RateKey, limit: RateLimit) -> bool {
        if let Some(backend) = &self.backend {
            match backend
                .incr_with_ttl(&key.backend_key(), limit.window.as_secs().max(1))
                .await
            {
                Ok(count) => return count <= u64::from(limit.limit),
                Err(e) => {
                    tracing::warn!(
                        "Rate limit backend failed for route {}, using local window: {}",
                        key.route,
                        e
                    );
                }
            }
        }

        self.local.allow(key, limit)
    }

    /// Drops idle local windows
    pub fn purge_idle(&self) -> usize {
        self.local
            .purge_idle(Instant::now(), self.limits.longest_window())
    }

    pub fn local(&self) -> &LocalLimiter {
        &self.local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::throttle::ThrottleError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct FailingBackend;

    #[async_trait]
    impl CounterBackend for FailingBackend {
        async fn incr_with_ttl(&self, _key: &str, _window_secs: u64) -> Result<u64, ThrottleError> {
            Err(ThrottleError::Unavailable("connection refused".to_string()))
        }
    }

    #[derive(Default)]
    struct CountingBackend {
        count: AtomicU64,
    }

    #[async_trait]
    impl CounterBackend for CountingBackend {
        async fn incr_with_ttl(&self, _key: &str, _window_secs: u64) -> Result<u64, ThrottleError> {
            Ok(self.count.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    #[test]
    fn test_local_keys_are_independent() {
        let limiter = LocalLimiter::new();
        let limit = RateLimit::new(1, 60);
        let now = Instant::now();

        assert!(limiter.allow_at(&RateKey::new(Route::Jobs, "a"), limit, now));
        assert!(!limiter.allow_at(&RateKey::new(Route::Jobs, "a"), limit, now));
        assert!(limiter.allow_at(&RateKey::new(Route::Jobs, "b"), limit, now));
        assert!(limiter.allow_at(&RateKey::new(Route::Login, "a"), limit, now));
    }

    #[test]
    fn test_purge_idle_removes_only_empty_windows() {
        let limiter = LocalLimiter::new();
        let limit = RateLimit::new(5, 60);
        let start = Instant::now();

        limiter.allow_at(&RateKey::new(Route::Jobs, "old"), limit, start);
        limiter.allow_at(
            &RateKey::new(Route::Jobs, "fresh"),
            limit,
            start + Duration::from_secs(50),
        );
        assert_eq!(limiter.tracked_keys(), 2);

        let removed = limiter.purge_idle(start + Duration::from_secs(70), Duration::from_secs(60));
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[tokio::test]
    async fn test_scrape_route_admits_twenty_per_minute() {
        let limiter = RateLimiter::new(RouteLimits::builtin());
        let mut admitted = 0;
        for _ in 0..25 {
            if limiter.check(Route::ScrapeAggregate, "10.0.0.1").await {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 20);
    }

    #[tokio::test]
    async fn test_backend_failure_fails_open_to_local() {
        let limiter = RateLimiter::new(RouteLimits::builtin()).with_backend(Arc::new(FailingBackend));

        assert!(limiter.check(Route::Login, "client").await);
        // The local window still enforces the limit while the backend is down
        let mut admitted = 1;
        for _ in 0..30 {
            if limiter.check(Route::Login, "client").await {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 25);
    }

    #[tokio::test]
    async fn test_backend_count_decides() {
        let backend = Arc::new(CountingBackend::default());
        let limiter = RateLimiter::new(RouteLimits::builtin()).with_backend(backend.clone());
        let key = RateKey::new(Route::Jobs, "client");
        let limit = RateLimit::new(2, 60);

        assert!(limiter.allow(&key, limit).await);
        assert!(limiter.allow(&key, limit).await);
        assert!(!limiter.allow(&key, limit).await);
        assert_eq!(backend.count.load(Ordering::SeqCst), 3);
        assert_eq!(limiter.local().tracked_keys(), 0);
    }
}
