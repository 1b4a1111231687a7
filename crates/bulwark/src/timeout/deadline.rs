// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, Instant};

use crate::Clock;

/// An absolute point in time after which an operation has exceeded its budget.
///
/// A deadline whose expiry cannot be represented (for example `Duration::MAX` from now)
/// never expires.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bulwark::timeout::Deadline;
///
/// let deadline = Deadline::from_timeout(Duration::from_secs(60));
///
/// assert!(!deadline.is_expired());
/// assert!(deadline.remaining() <= Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct Deadline {
    clock: Clock,
    expires_at: Option<Instant>,
    timeout: Duration,
}

impl Deadline {
    /// Creates a deadline `timeout` from now, measured on the system clock.
    #[must_use]
    pub fn from_timeout(timeout: Duration) -> Self {
        Self::with_clock(&Clock::new_system(), timeout)
    }

    /// Creates a deadline `timeout` from now, measured on `clock`.
    #[must_use]
    pub fn with_clock(clock: &Clock, timeout: Duration) -> Self {
        Self {
            expires_at: clock.instant().checked_add(timeout),
            clock: clock.clone(),
            timeout,
        }
    }

    /// Returns the time left before expiry, or zero once expired.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.expires_at
            .map_or(Duration::MAX, |expires_at| expires_at.saturating_duration_since(self.clock.instant()))
    }

    /// Returns `true` once the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| self.clock.instant() >= expires_at)
    }

    /// Returns the instant of expiry, or `None` if the deadline never expires.
    #[must_use]
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Returns the budget this deadline was created with.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
