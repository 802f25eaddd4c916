use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, Mutex};

/// Source of the current time for TOTP windows.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn unix_seconds(&self) -> i64 {
        self.now().timestamp()
    }
}

pub fn default_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests.
pub struct MockClock {
    current_time: Mutex<DateTime<Utc>>,
}

impl MockClock {
    pub fn new(initial: DateTime<Utc>) -> Self {
        Self {
            current_time: Mutex::new(initial),
        }
    }

    pub fn at_unix(seconds: i64) -> Self {
        Self::new(DateTime::from_timestamp(seconds, 0).unwrap_or_default())
    }

    pub fn advance(&self, duration: TimeDelta) {
        let mut time = self
            .current_time
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *time += duration;
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self
            .current_time
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = instant;
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self
            .current_time
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
