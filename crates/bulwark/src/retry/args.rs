// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use super::Attempt;

/// Arguments for the [`retry_if`][super::RetryBuilder::retry_if] predicate.
#[derive(Debug, Clone, Copy)]
pub struct RetryArgs {
    pub(super) attempt: Attempt,
}

impl RetryArgs {
    /// Returns the attempt that just failed.
    #[must_use]
    pub fn attempt(&self) -> Attempt {
        self.attempt
    }
}

/// Arguments for the [`on_retry`][super::RetryBuilder::on_retry] callback.
#[derive(Debug, Clone, Copy)]
pub struct OnRetryArgs {
    pub(super) attempt: Attempt,
    pub(super) delay: Duration,
}

impl OnRetryArgs {
    /// Returns the attempt that just failed.
    #[must_use]
    pub fn attempt(&self) -> Attempt {
        self.attempt
    }

    /// Returns how long the policy sleeps before the next attempt.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}
