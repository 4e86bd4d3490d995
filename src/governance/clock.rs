//! Clock sources for the pipeline.
//!
//! The rate limiter works on monotonic `Instant`s; the temporal policy and the
//! audit log work on local wall-clock time. Both come from the same `Clock`
//! so tests can move them together.

use std::fmt::Debug;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};

/// Source of the current time.
pub trait Clock: Send + Sync + Debug {
    /// Monotonic time used for window arithmetic.
    fn now(&self) -> Instant;

    /// Local wall-clock time.
    fn local_now(&self) -> NaiveDateTime;
}

/// System clock implementation using `Instant::now()` and `Local::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn local_now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualState>,
}

#[derive(Debug, Clone, Copy)]
struct ManualState {
    elapsed: Duration,
    wall: NaiveDateTime,
}

impl ManualClock {
    /// Start the clock at the given local wall-clock time.
    pub fn new(wall: NaiveDateTime) -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState {
                elapsed: Duration::ZERO,
                wall,
            }),
        }
    }

    /// Move both the monotonic and the wall clock forward.
    pub fn advance(&self, by: Duration) {
        let mut state = self.lock();
        state.elapsed += by;
        state.wall += chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
    }

    /// Set the wall clock without touching monotonic time.
    pub fn set_local(&self, wall: NaiveDateTime) {
        self.lock().wall = wall;
    }

    /// Time elapsed on the monotonic side since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.lock().elapsed
    }

    fn local_now(&self) -> NaiveDateTime {
        self.lock().wall
    }
}
