use std::time::{Duration, Instant};

/// A single pending action that fires once its input has been idle for
/// `delay`. Re-triggering moves the deadline; time is passed in by the caller.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending
    }

    /// Drop any pending deadline and schedule a new one `delay` from `now`.
    pub fn trigger(&mut self, now: Instant) {
        self.trigger_with_delay(now, self.delay);
    }

    pub fn trigger_with_delay(&mut self, now: Instant, delay: Duration) {
        self.pending = Some(now + delay);
    }

    /// True exactly once when the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(deadline) if now >= deadline => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Fire immediately if anything is pending.
    pub fn flush(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Time left until the deadline, if any.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.pending.map(|deadline| deadline.saturating_duration_since(now))
    }
}
