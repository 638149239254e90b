//! Time source for every temporal decision in the gate.
//!
//! Stages never read the system time themselves. The HTTP adapter stamps
//! each request once with [`Clock::now`], and the rate limiter, time gate and
//! request logger all read that stamp.

use chrono::{Local, NaiveDateTime, TimeDelta};
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

/// Port for obtaining the current local wall-clock time.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> NaiveDateTime;
}

/// Clock backed by the host's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Settable clock for deterministic tests.
///
/// Clones share the same underlying time, so a clone handed to the server can
/// be advanced from the test body.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<NaiveDateTime>>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, at: NaiveDateTime) {
        *self.current.lock().expect("manual clock mutex poisoned") = at;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut current = self.current.lock().expect("manual clock mutex poisoned");
        *current += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.current.lock().expect("manual clock mutex poisoned")
    }
}
