//! Scheduled callbacks driven by the event loop
//!
//! Each timer the daemon uses (install polling, trigger debounce, trust
//! re-checks) is a `TimerSlot`. A slot holds at most one live schedule:
//! scheduling again invalidates the previous one, so duplicate firings are
//! impossible by construction. Slots never look at the wall clock; the
//! owner passes `now` in, which keeps them testable with a virtual clock.

use std::time::{Duration, Instant};

use tracing::trace;

/// Identifies one schedule of a slot; stale once the slot is rescheduled or cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken(u64);

#[derive(Debug, Clone, Copy)]
struct Schedule {
    token: TimerToken,
    deadline: Instant,
    period: Option<Duration>,
}

/// A single cancellable timer
#[derive(Debug)]
pub struct TimerSlot {
    name: &'static str,
    generation: u64,
    schedule: Option<Schedule>,
}

impl TimerSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            generation: 0,
            schedule: None,
        }
    }

    /// Fire once, `delay` from `now`
    pub fn schedule_once(&mut self, now: Instant, delay: Duration) -> TimerToken {
        self.arm(now + delay, None)
    }

    /// Fire every `period`, first at `now + period`
    pub fn schedule_repeating(&mut self, now: Instant, period: Duration) -> TimerToken {
        self.arm(now + period, Some(period))
    }

    fn arm(&mut self, deadline: Instant, period: Option<Duration>) -> TimerToken {
        self.cancel();
        self.generation += 1;
        let token = TimerToken(self.generation);
        self.schedule = Some(Schedule {
            token,
            deadline,
            period,
        });
        token
    }

    /// Invalidate the live schedule, if any
    pub fn cancel(&mut self) {
        self.schedule = None;
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.schedule.is_some()
    }

    pub fn is_live(&self, token: TimerToken) -> bool {
        self.schedule.map_or(false, |s| s.token == token)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.schedule.map(|s| s.deadline)
    }

    /// Consume one firing if the deadline has passed.
    ///
    /// Repeating slots re-arm relative to `now`, so a late loop never
    /// produces a burst of catch-up firings.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        let Some(schedule) = self.schedule else {
            return false;
        };
        if now < schedule.deadline {
            return false;
        }

        self.schedule = schedule.period.map(|period| Schedule {
            deadline: now + period,
            ..schedule
        });
        trace!(timer = self.name, "timer fired");
        true
    }
}

/// Earliest of a set of optional deadlines
pub fn earliest(deadlines: impl IntoIterator<Item = Option<Instant>>) -> Option<Instant> {
    deadlines.into_iter().flatten().min()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_one_shot_fires_once() {
        let start = Instant::now();
        let mut slot = TimerSlot::new("debounce");
        slot.schedule_once(start, 100 * MS);

        assert!(!slot.fire_if_due(start + 99 * MS));
        assert!(slot.fire_if_due(start + 100 * MS));
        assert!(!slot.is_armed());
        assert!(!slot.fire_if_due(start + 500 * MS));
    }

    #[test]
    fn test_repeating_rearms_without_catch_up() {
        let start = Instant::now();
        let mut slot = TimerSlot::new("poll");
        slot.schedule_repeating(start, 2000 * MS);

        // Loop ran late by several periods: only one firing
        assert!(slot.fire_if_due(start + 7000 * MS));
        assert!(!slot.fire_if_due(start + 7000 * MS));
        assert_eq!(slot.deadline(), Some(start + 9000 * MS));
    }

    #[test]
    fn test_reschedule_invalidates_previous_token() {
        let start = Instant::now();
        let mut slot = TimerSlot::new("poll");
        let first = slot.schedule_repeating(start, 2000 * MS);
        let second = slot.schedule_repeating(start + 10 * MS, 2000 * MS);

        assert!(!slot.is_live(first));
        assert!(slot.is_live(second));
        assert_eq!(slot.deadline(), Some(start + 2010 * MS));
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut slot = TimerSlot::new("trust-check");
        let token = slot.schedule_once(start, MS);
        slot.cancel();

        assert!(!slot.is_live(token));
        assert!(!slot.fire_if_due(start + 10 * MS));
        assert_eq!(slot.deadline(), None);
    }

    #[test]
    fn test_earliest() {
        let start = Instant::now();
        assert_eq!(earliest([None, None]), None);
        assert_eq!(
            earliest([Some(start + 5 * MS), None, Some(start + 2 * MS)]),
            Some(start + 2 * MS)
        );
    }
}
