//! Single-shot cancelable deadlines.
//!
//! Each resolver and controller owns its timers outright. Arming a timer
//! replaces whatever deadline it held, so a superseding event always cancels
//! the stale one. Timers fire only when their owner is ticked with an
//! instant at or past the deadline.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CancelableTimer {
    deadline: Option<Instant>,
}

impl CancelableTimer {
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    /// Arm (or re-arm) the timer to fire `delay` after `now`.
    pub fn arm(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    /// Cancel the pending deadline. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    /// Disarm and return true when the deadline has been reached.
    pub fn fire(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }
}

/// Earliest of a set of optional deadlines.
pub fn earliest(
    deadlines: impl IntoIterator<Item = Option<Instant>>,
) -> Option<Instant> {
    deadlines.into_iter().flatten().min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_at_deadline() {
        let t0 = Instant::now();
        let mut timer = CancelableTimer::new();
        timer.arm(t0, Duration::from_millis(100));

        assert!(!timer.fire(t0 + Duration::from_millis(99)));
        assert!(timer.fire(t0 + Duration::from_millis(100)));
        assert!(!timer.fire(t0 + Duration::from_millis(200)));
        assert!(!timer.is_armed());
    }

    #[test]
    fn rearm_replaces_deadline() {
        let t0 = Instant::now();
        let mut timer = CancelableTimer::new();
        timer.arm(t0, Duration::from_millis(100));
        timer.arm(t0 + Duration::from_millis(50), Duration::from_millis(100));

        assert!(!timer.fire(t0 + Duration::from_millis(120)));
        assert!(timer.fire(t0 + Duration::from_millis(150)));
    }

    #[test]
    fn cancel_reports_pending() {
        let mut timer = CancelableTimer::new();
        assert!(!timer.cancel());
        timer.arm(Instant::now(), Duration::from_secs(1));
        assert!(timer.cancel());
        assert_eq!(timer.deadline(), None);
    }

    #[test]
    fn earliest_skips_empty() {
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(1);
        assert_eq!(earliest([None, Some(t1), Some(t0)]), Some(t0));
        assert_eq!(earliest([None, None]), None);
    }
}
