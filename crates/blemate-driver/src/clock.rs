//! Monotonic time source and deadlines.
//!
//! Every wait in the driver is a busy-poll bounded by a [`Deadline`] measured
//! against a [`Clock`], never by counting iterations, so behaviour does not
//! depend on how fast the channel delivers bytes.

use std::time::{Duration, Instant};

/// A monotonic time source.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    /// Block the caller for `duration`.
    fn sleep(&self, duration: Duration);
}

impl<K: Clock + ?Sized> Clock for &K {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is now.
    pub fn new() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// A start timestamp plus a fixed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    start: Duration,
    length: Duration,
}

impl Deadline {
    /// Start a deadline of `length` from the clock's current reading.
    pub fn start<K: Clock + ?Sized>(clock: &K, length: Duration) -> Self {
        Deadline {
            start: clock.now(),
            length,
        }
    }

    /// Whether the deadline has passed.
    pub fn expired<K: Clock + ?Sized>(&self, clock: &K) -> bool {
        self.elapsed(clock) >= self.length
    }

    /// Time since the deadline started.
    pub fn elapsed<K: Clock + ?Sized>(&self, clock: &K) -> Duration {
        clock.now().saturating_sub(self.start)
    }

    /// The configured length.
    pub fn length(&self) -> Duration {
        self.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ManualClock;

    #[test]
    fn test_deadline_expires_on_clock_time() {
        let clock = ManualClock::with_tick(Duration::ZERO);
        let deadline = Deadline::start(&clock, Duration::from_millis(100));

        clock.advance(Duration::from_millis(99));
        assert!(!deadline.expired(&clock));

        clock.advance(Duration::from_millis(1));
        assert!(deadline.expired(&clock));
    }

    #[test]
    fn test_zero_length_deadline_is_expired() {
        let clock = ManualClock::with_tick(Duration::ZERO);
        let deadline = Deadline::start(&clock, Duration::ZERO);
        assert!(deadline.expired(&clock));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
