use crate::config::ThrottleConfig;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Rate-limited route classes
///
/// Every inbound path resolves to exactly one of these, so the limit table can
/// never reference a route that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    ScrapeAggregate,
    Jobs,
    Schedules,
    Health,
    Other,
}

impl Route {
    /// Resolves a request path to its route class
    ///
    /// # Examples
    ///
    /// ```
    /// use shadowgraph::throttle::Route;
    ///
    /// assert_eq!(Route::from_path("/auth/login"), Route::Login);
    /// assert_eq!(Route::from_path("/jobs/scrape/abc"), Route::Jobs);
    /// assert_eq!(Route::from_path("/unknown"), Route::Other);
    /// ```
    pub fn from_path(path: &str) -> Self {
        let path = path.trim_end_matches('/');
        match path {
            "/auth/login" => Self::Login,
            "/scrape-aggregate" => Self::ScrapeAggregate,
            "/health" | "/ops/readiness" => Self::Health,
            p if p == "/jobs" || p.starts_with("/jobs/") => Self::Jobs,
            p if p.starts_with("/crawler/schedules") => Self::Schedules,
            _ => Self::Other,
        }
    }

    /// Parses the route name used in `[[throttle.route]]` entries
    ///
    /// `Other` has no name; it is governed by `[throttle.default]`.
    pub fn from_config_name(name: &str) -> Option<Self> {
        match name {
            "login" => Some(Self::Login),
            "scrape-aggregate" => Some(Self::ScrapeAggregate),
            "jobs" => Some(Self::Jobs),
            "schedules" => Some(Self::Schedules),
            "health" => Some(Self::Health),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::ScrapeAggregate => "scrape-aggregate",
            Self::Jobs => "jobs",
            Self::Schedules => "schedules",
            Self::Health => "health",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// At most `limit` events per `window`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: u32,
    pub window: Duration,
}

impl RateLimit {
    pub fn new(limit: u32, window_seconds: u64) -> Self {
        Self {
            limit,
            window: Duration::from_secs(window_seconds),
        }
    }
}

/// Route to limit table with a fallback entry
#[derive(Debug, Clone)]
pub struct RouteLimits {
    default: RateLimit,
    routes: HashMap<Route, RateLimit>,
}

impl RouteLimits {
    /// The built-in table: 120/60s by default, 25/60s for login, 20/60s for direct scrapes
    pub fn builtin() -> Self {
        let mut routes = HashMap::new();
        routes.insert(Route::Login, RateLimit::new(25, 60));
        routes.insert(Route::ScrapeAggregate, RateLimit::new(20, 60));
        Self {
            default: RateLimit::new(120, 60),
            routes,
        }
    }

    /// Builds the table from configuration, layering overrides over the built-in entries
    ///
    /// Route names are checked during config validation; unknown names are skipped here.
    pub fn from_config(config: &ThrottleConfig) -> Self {
        let mut limits = Self::builtin();
        limits.default = RateLimit::new(config.default.limit, config.default.window_seconds);
        for entry in &config.routes {
            if let Some(route) = Route::from_config_name(&entry.route) {
                limits
                    .routes
                    .insert(route, RateLimit::new(entry.limit, entry.window_seconds));
            }
        }
        limits
    }

    pub fn with_route(mut self, route: Route, limit: RateLimit) -> Self {
        self.routes.insert(route, limit);
        self
    }

    pub fn limit_for(&self, route: Route) -> RateLimit {
        self.routes.get(&route).copied().unwrap_or(self.default)
    }

    /// Longest window in the table, used to decide when idle windows can be dropped
    pub fn longest_window(&self) -> Duration {
        self.routes
            .values()
            .map(|l| l.window)
            .fold(self.default.window, Duration::max)
    }
}

impl Default for RouteLimits {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Identifies one rate window: a route class and a client identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateKey {
    pub route: Route,
    pub client: String,
}

impl RateKey {
    pub fn new(route: Route, client: impl Into<String>) -> Self {
        Self {
            route,
            client: client.into(),
        }
    }

    /// Key used in the shared counter store
    ///
    /// The client identity may be a bearer credential, so only a digest of it leaves the process.
    pub fn backend_key(&self) -> String {
        let digest = Sha256::digest(self.client.as_bytes());
        format!("{}:{}", self.route.as_str(), hex::encode(&digest[..16]))
    }
}
