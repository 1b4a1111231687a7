// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, Instant};

/// Provides the time source used by every policy in this crate.
///
/// Policies read time and sleep through a `Clock` instead of calling [`Instant::now`] or
/// [`std::thread::sleep`], which keeps time-dependent behavior such as circuit breaker
/// timeouts and retry backoff testable. Bulkhead wait bounds are the exception: they are
/// enforced by a condition variable in real time.
///
/// In production, use [`Clock::new_system`] (also the [`Default`]). With the `test-util`
/// feature enabled, a clock created from `ClockControl` only moves forward when the test
/// advances it, and sleeping on such a clock advances it instead of blocking the thread.
///
/// Cloning a clock is cheap and every clone observes the same time.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bulwark::Clock;
///
/// let clock = Clock::new_system();
/// let stopwatch = clock.stopwatch();
///
/// clock.sleep(Duration::from_millis(1));
///
/// assert!(stopwatch.elapsed() >= Duration::from_millis(1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Clock(ClockState);

#[derive(Debug, Clone, Default)]
enum ClockState {
    #[default]
    System,
    #[cfg(any(feature = "test-util", test))]
    Control(crate::ClockControl),
}

impl Clock {
    /// Creates a clock backed by the operating system's monotonic clock.
    #[must_use]
    pub fn new_system() -> Self {
        Self(ClockState::System)
    }

    #[cfg(any(feature = "test-util", test))]
    pub(crate) fn from_control(control: crate::ClockControl) -> Self {
        Self(ClockState::Control(control))
    }

    /// Returns the current monotonic instant.
    #[must_use]
    pub fn instant(&self) -> Instant {
        match &self.0 {
            ClockState::System => Instant::now(),
            #[cfg(any(feature = "test-util", test))]
            ClockState::Control(control) => control.instant(),
        }
    }

    /// Blocks the calling thread for `duration`.
    ///
    /// A zero duration returns immediately. On a controlled clock the time is advanced by
    /// `duration` and the call returns without blocking.
    pub fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }

        match &self.0 {
            ClockState::System => std::thread::sleep(duration),
            #[cfg(any(feature = "test-util", test))]
            ClockState::Control(control) => control.advance(duration),
        }
    }

    /// Starts a [`Stopwatch`] measuring time elapsed on this clock.
    #[must_use]
    pub fn stopwatch(&self) -> Stopwatch {
        Stopwatch {
            start: self.instant(),
            clock: self.clone(),
        }
    }
}

impl AsRef<Self> for Clock {
    fn as_ref(&self) -> &Self {
        self
    }
}

/// Measures time elapsed since its creation on a [`Clock`].
#[derive(Debug, Clone)]
pub struct Stopwatch {
    clock: Clock,
    start: Instant,
}

impl Stopwatch {
    /// Returns the time elapsed since the stopwatch was started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.clock.instant().saturating_duration_since(self.start)
    }

    /// Returns the instant at which the stopwatch was started.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.start
    }
}
