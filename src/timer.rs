//! The periodic timer the beat engine is driven by.
//!
//! The engine never sleeps or spawns threads itself. It asks a [`Timer`] to
//! keep a repeating deadline and the host loop polls that deadline, so every
//! tick runs on the same thread that mutates the engine.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Identifies one repeating schedule inside a [`Timer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

pub trait Timer {
    /// Starts a repeating schedule whose first firing is one `interval` from now.
    fn schedule_repeating(&mut self, interval: Duration) -> TimerHandle;

    /// Changes the interval and restarts the countdown from now.
    fn reschedule(&mut self, handle: TimerHandle, interval: Duration);

    fn cancel(&mut self, handle: TimerHandle);

    /// Returns true if `handle` has come due, consuming that firing.
    fn poll(&mut self, handle: TimerHandle) -> bool;
}

/// A monotonic time source measured from an arbitrary epoch.
pub trait Clock {
    fn now(&self) -> Duration;
}

pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
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
        self.epoch.elapsed()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.now_ms.load(Ordering::Relaxed))
    }
}

#[derive(Debug)]
struct Schedule {
    interval: Duration,
    deadline: Duration,
}

/// Deadline-based [`Timer`] over any [`Clock`].
///
/// After a firing the next deadline is the previous deadline plus the
/// interval, so polling jitter does not accumulate into tempo drift. A
/// deadline that lands exactly on the current time still fires on the next
/// poll. If the host falls further behind than that, the missed firings
/// collapse into one and counting restarts from the current time.
pub struct IntervalTimer<C: Clock> {
    clock: C,
    next_id: u64,
    schedules: HashMap<TimerHandle, Schedule>,
}

impl<C: Clock> IntervalTimer<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            next_id: 0,
            schedules: HashMap::new(),
        }
    }

    /// Interval of an active schedule.
    pub fn interval_of(&self, handle: TimerHandle) -> Option<Duration> {
        self.schedules.get(&handle).map(|s| s.interval)
    }

    /// Time left until `handle` fires, zero if it is already due.
    pub fn remaining(&self, handle: TimerHandle) -> Option<Duration> {
        let now = self.clock.now();
        self.schedules
            .get(&handle)
            .map(|s| s.deadline.saturating_sub(now))
    }

    pub fn active(&self) -> usize {
        self.schedules.len()
    }
}

impl IntervalTimer<SystemClock> {
    pub fn system() -> Self {
        Self::new(SystemClock::new())
    }
}

impl<C: Clock> Timer for IntervalTimer<C> {
    fn schedule_repeating(&mut self, interval: Duration) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        let deadline = self.clock.now() + interval;
        self.schedules.insert(handle, Schedule { interval, deadline });
        handle
    }

    fn reschedule(&mut self, handle: TimerHandle, interval: Duration) {
        let now = self.clock.now();
        if let Some(schedule) = self.schedules.get_mut(&handle) {
            schedule.interval = interval;
            schedule.deadline = now + interval;
        }
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.schedules.remove(&handle);
    }

    fn poll(&mut self, handle: TimerHandle) -> bool {
        let now = self.clock.now();
        let Some(schedule) = self.schedules.get_mut(&handle) else {
            return false;
        };
        if now < schedule.deadline {
            return false;
        }

        schedule.deadline += schedule.interval;
        if schedule.deadline < now {
            schedule.deadline = now + schedule.interval;
        }
        true
    }
}
