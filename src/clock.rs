//! Wall-clock capability. The lending rules only ever ask for "now", so tests
//! can swap in a [`ManualClock`] and walk time forward deterministically.

use std::cell::Cell;

use chrono::{Duration, Local, NaiveDateTime};

use crate::models::Timestamp;

pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Reads the local time zone of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_datetime(&Local::now())
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Cell<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            current: Cell::new(start),
        }
    }

    pub fn set(&self, moment: NaiveDateTime) {
        self.current.set(moment);
    }

    pub fn advance(&self, by: Duration) {
        self.current.set(self.current.get() + by);
    }

    pub fn current(&self) -> NaiveDateTime {
        self.current.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_naive(self.current.get())
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
