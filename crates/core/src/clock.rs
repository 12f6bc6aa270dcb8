// SPDX-License-Identifier: MIT

//! Clock abstraction for testable time handling

use crate::time::TimePoint;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// A clock that provides the current wall-clock time
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> TimePoint;
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimePoint {
        SystemTime::now()
    }
}

/// Fake clock for testing with controllable time
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<TimePoint>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self { current: Arc::new(Mutex::new(SystemTime::now())) }
    }

    /// Start the clock at a specific instant.
    pub fn at(start: TimePoint) -> Self {
        Self { current: Arc::new(Mutex::new(start)) }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        *self.current.lock() += duration;
    }

    /// Set the clock to a specific instant
    pub fn set(&self, instant: TimePoint) {
        *self.current.lock() = instant;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> TimePoint {
        *self.current.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
