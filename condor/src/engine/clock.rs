use chrono::{DateTime, TimeDelta, Utc};
use std::{
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

/// Defines how the engine determines the current time and suspends between
/// loop iterations.
///
/// Injected so tests can step deterministically instead of sleeping.
pub trait EngineClock {
    fn time(&self) -> DateTime<Utc>;

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Live clock using `Utc::now()` and the tokio timer.
#[derive(Debug, Copy, Clone, Default)]
pub struct LiveClock;

impl EngineClock for LiveClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Deterministic clock for tests: `sleep` returns immediately and advances
/// the reported time by the requested duration.
#[derive(Debug, Clone)]
pub struct StepClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl StepClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock manually, eg/ to cross a calendar-day boundary.
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(|poison| poison.into_inner());
        *now += delta;
    }
}

impl EngineClock for StepClock {
    fn time(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(TimeDelta::from_std(duration).unwrap_or_else(|_| TimeDelta::zero()));
    }
}
