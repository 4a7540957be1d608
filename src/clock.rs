use chrono::{DateTime, Utc};

/// Wall-clock source, injected so retention cutoffs and fetch stamps are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn now_seconds(&self) -> i64 {
        self.now().timestamp()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
