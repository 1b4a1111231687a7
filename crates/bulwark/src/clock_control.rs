// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::Clock;

/// Controls the flow of time in tests.
///
/// A clock created with [`ClockControl::to_clock`] is frozen: its time only moves when the
/// test calls [`advance`][Self::advance], or when a policy sleeps on it. This makes circuit
/// breaker timeouts, deadlines and retry backoff deterministic and instantaneous in tests.
///
/// `ClockControl` is available when the `test-util` feature is enabled. Never enable that
/// feature outside of `dev-dependencies`.
///
/// Bulkhead waits are not affected by `ClockControl` because they block on a condition
/// variable that only understands real time.
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "test-util")]
/// # {
/// # use std::time::Duration;
/// # use bulwark::ClockControl;
/// let control = ClockControl::new();
/// let clock = control.to_clock();
///
/// let start = clock.instant();
/// control.advance(Duration::from_secs(5));
///
/// assert_eq!(clock.instant() - start, Duration::from_secs(5));
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClockControl {
    // Shared by every clock handed out so that all of them observe the same time.
    state: Arc<Mutex<State>>,
}

#[derive(Debug)]
struct State {
    origin: Instant,
    offset: Duration,
}

impl Default for State {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            offset: Duration::ZERO,
        }
    }
}

impl ClockControl {
    /// Creates a new `ClockControl` frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a [`Clock`] whose time is driven by this control.
    #[must_use]
    pub fn to_clock(&self) -> Clock {
        Clock::from_control(self.clone())
    }

    /// Moves time forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.offset = state.offset.saturating_add(duration);
    }

    /// Moves time forward by the given number of milliseconds.
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Returns the total time this control has been advanced by.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.state.lock().offset
    }

    pub(crate) fn instant(&self) -> Instant {
        let state = self.state.lock();
        state.origin.checked_add(state.offset).unwrap_or(state.origin)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_until_advanced() {
        let control = ClockControl::new();
        let clock = control.to_clock();

        let first = clock.instant();
        let second = clock.instant();
        assert_eq!(first, second);

        control.advance_millis(15);
        assert_eq!(clock.instant() - first, Duration::from_millis(15));
        assert_eq!(control.elapsed(), Duration::from_millis(15));
    }

    #[test]
    fn clones_share_time() {
        let control = ClockControl::new();
        let clock_a = control.to_clock();
        let clock_b = control.clone().to_clock();

        control.advance(Duration::from_secs(1));

        assert_eq!(clock_a.instant(), clock_b.instant());
    }

    #[test]
    fn advance_saturates() {
        let control = ClockControl::new();
        let start = control.instant();

        control.advance(Duration::MAX);
        control.advance(Duration::from_secs(1));

        assert_eq!(control.elapsed(), Duration::MAX);
        // An unrepresentable instant falls back to the origin rather than panicking.
        assert!(control.instant() >= start);
    }
}
