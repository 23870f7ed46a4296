use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Source of record timestamps
///
/// Implementations must never go backwards: the store relies on timestamps being
/// non-decreasing in arrival order.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock in microseconds since the Unix epoch, clamped to never step back
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicI64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        let wall = Utc::now().timestamp_micros();
        let previous = self.last.fetch_max(wall, Ordering::SeqCst);
        previous.max(wall)
    }
}

/// Deterministic counter clock
#[derive(Debug)]
pub struct SequenceClock {
    next: AtomicI64,
    step: i64,
}

impl SequenceClock {
    pub fn new(start: i64, step: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
            step: step.max(0),
        }
    }
}

impl Clock for SequenceClock {
    fn now(&self) -> i64 {
        self.next.fetch_add(self.step, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let mut last = clock.now();
        for _ in 0..1000 {
            let now = clock.now();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn test_sequence_clock() {
        let clock = SequenceClock::new(10, 5);
        assert_eq!(clock.now(), 10);
        assert_eq!(clock.now(), 15);
        assert_eq!(clock.now(), 20);
    }
}
