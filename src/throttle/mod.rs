//! Throttle module for inbound request and login-failure limits
//!
//! # Components
//!
//! - `SlidingWindow`: Per-key log of event timestamps
//! - `RateLimiter`: Route-aware limiter with an optional shared Redis backend
//! - `LoginGuard`: Lockout tracker for repeated failed logins

mod backend;
mod limiter;
mod lockout;
mod route;
mod window;

pub use backend::{CounterBackend, RedisCounter, ThrottleError};
pub use limiter::{LocalLimiter, RateLimiter};
pub use lockout::LoginGuard;
pub use route::{RateKey, RateLimit, Route, RouteLimits};
pub use window::SlidingWindow;
