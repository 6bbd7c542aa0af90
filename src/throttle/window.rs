use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Sliding log of event timestamps for one rate key
///
/// Timestamps are kept in arrival order so pruning only ever touches the front.
#[derive(Debug, Default, Clone)]
pub struct SlidingWindow {
    events: VecDeque<Instant>,
}

impl SlidingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every event whose age at `now` is at least `window`
    pub fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.events.front() {
            if now.saturating_duration_since(*oldest) >= window {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    /// Records an event at `now` if fewer than `limit` events remain in the window
    ///
    /// # Returns
    ///
    /// * `true` - The event was admitted and recorded
    /// * `false` - The window is full; nothing was recorded
    pub fn allow_at(&mut self, now: Instant, limit: u32, window: Duration) -> bool {
        self.prune(now, window);
        if self.events.len() < limit as usize {
            self.events.push_back(now);
            true
        } else {
            false
        }
    }

    /// Records an event unconditionally, after pruning
    pub fn record_at(&mut self, now: Instant, window: Duration) -> usize {
        self.prune(now, window);
        self.events.push_back(now);
        self.events.len()
    }

    /// Number of events currently held (call `prune` first for an exact count)
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
