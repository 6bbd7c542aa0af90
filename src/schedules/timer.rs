use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use uuid::Uuid;

/// One run of a timer task
pub type TimerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Work run on every tick of a recurring timer
pub type TimerTask = Arc<dyn Fn() -> TimerFuture + Send + Sync>;

/// Source of recurring wake-ups, keyed by id
pub trait Timer: Send + Sync {
    /// Runs `task` every `period`, first one full period from now
    ///
    /// Registering an id that already has a timer replaces it.
    fn schedule_every(&self, id: Uuid, period: Duration, task: TimerTask);

    /// Stops the timer for `id`; false if none was registered
    fn cancel(&self, id: &Uuid) -> bool;
}

/// `Timer` backed by one tokio task per id
#[derive(Debug, Default)]
pub struct TokioTimer {
    handles: DashMap<Uuid, JoinHandle<()>>,
}

impl TokioTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live timers
    pub fn active(&self) -> usize {
        self.handles.len()
    }
}

impl Timer for TokioTimer {
    fn schedule_every(&self, id: Uuid, period: Duration, task: TimerTask) {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                task().await;
            }
        });

        if let Some(previous) = self.handles.insert(id, handle) {
            previous.abort();
        }
    }

    fn cancel(&self, id: &Uuid) -> bool {
        match self.handles.remove(id) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        for entry in self.handles.iter() {
            entry.value().abort();
        }
    }
}
