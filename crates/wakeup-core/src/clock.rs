//! Wall-clock sampling.
//!
//! Every state-machine entry point takes a [`Moment`] explicitly so that the
//! engine never reads the system clock on its own. Wall time decides which
//! alarm matches; the monotonic counter drives countdown deadlines.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{Duration, Local, NaiveDateTime};

use crate::alarm::ClockTime;

/// A point in time as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
    /// Local wall-clock time.
    pub wall: NaiveDateTime,
    /// Monotonic milliseconds since an arbitrary origin.
    pub mono_ms: u64,
}

impl Moment {
    pub fn new(wall: NaiveDateTime, mono_ms: u64) -> Self {
        Self { wall, mono_ms }
    }

    pub fn clock_time(&self) -> ClockTime {
        ClockTime::of(self.wall)
    }

    /// The same moment `ms` milliseconds later on both clocks.
    pub fn plus_ms(&self, ms: u64) -> Self {
        Self {
            wall: self.wall + Duration::milliseconds(ms as i64),
            mono_ms: self.mono_ms + ms,
        }
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> Moment;
}

/// Local system time plus a process-local monotonic counter.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
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
    fn now(&self) -> Moment {
        Moment {
            wall: Local::now().naive_local(),
            mono_ms: self.origin.elapsed().as_millis() as u64,
        }
    }
}

/// Hand-driven clock for tests and simulations.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<Moment>>,
}

impl ManualClock {
    pub fn new(wall: NaiveDateTime) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Moment::new(wall, 0))),
        }
    }

    pub fn advance_ms(&self, ms: u64) {
        let mut m = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *m = m.plus_ms(ms);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance_ms(secs * 1000);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Moment {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One poller sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub now: Moment,
    /// First sample of a new `HH:MM` minute.
    pub minute_changed: bool,
}

/// Samples the clock once per second and notes minute boundaries.
#[derive(Debug, Default)]
pub struct ClockPoller {
    last_minute: Option<ClockTime>,
}

impl ClockPoller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, clock: &dyn Clock) -> Tick {
        let now = clock.now();
        let minute = now.clock_time();
        let minute_changed = self.last_minute != Some(minute);
        self.last_minute = Some(minute);
        Tick {
            now,
            minute_changed,
        }
    }
}
