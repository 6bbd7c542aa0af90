use super::window::SlidingWindow;
use crate::config::LoginConfig;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct FailureRecord {
    failures: SlidingWindow,
    locked_until: Option<Instant>,
}

/// Locks an account identity after repeated failed logins
///
/// Identities are compared case-insensitively. Once `max_failures` failures land
/// inside the window the identity is locked for one full window; failures are not
/// forgotten when the lock is applied, so a failure right after the lock expires
/// can re-lock immediately.
#[derive(Debug)]
pub struct LoginGuard {
    max_failures: u32,
    window: Duration,
    records: Mutex<HashMap<String, FailureRecord>>,
}

impl LoginGuard {
    pub fn new(max_failures: u32, window: Duration) -> Self {
        Self {
            max_failures,
            window,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &LoginConfig) -> Self {
        Self::new(
            config.max_failures,
            Duration::from_secs(config.lock_window_seconds),
        )
    }

    fn normalize(identity: &str) -> String {
        identity.trim().to_lowercase()
    }

    /// Returns the remaining lock time if `identity` is locked
    pub fn is_locked(&self, identity: &str) -> Option<Duration> {
        self.is_locked_at(identity, Instant::now())
    }

    pub fn is_locked_at(&self, identity: &str, now: Instant) -> Option<Duration> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records
            .get(&Self::normalize(identity))
            .and_then(|r| r.locked_until)
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    /// Records a failed login for `identity`
    ///
    /// # Returns
    ///
    /// The lock duration if this failure caused (or extended) a lock
    pub fn record_failure(&self, identity: &str) -> Option<Duration> {
        self.record_failure_at(identity, Instant::now())
    }

    pub fn record_failure_at(&self, identity: &str, now: Instant) -> Option<Duration> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let record = records.entry(Self::normalize(identity)).or_default();
        let failures = record.failures.record_at(now, self.window);

        if failures >= self.max_failures as usize {
            record.locked_until = Some(now + self.window);
            Some(self.window)
        } else {
            None
        }
    }

    /// Forgets all failures and any lock for `identity`
    pub fn clear_failures(&self, identity: &str) {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.remove(&Self::normalize(identity));
    }

    /// Drops identities with no failures left in the window and no live lock
    ///
    /// # Returns
    ///
    /// The number of identities forgotten
    pub fn purge_idle(&self, now: Instant) -> usize {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let before = records.len();
        records.retain(|_, record| {
            record.failures.prune(now, self.window);
            let locked = record.locked_until.is_some_and(|until| until > now);
            locked || !record.failures.is_empty()
        });
        before - records.len()
    }

    pub fn tracked_identities(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
