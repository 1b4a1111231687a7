// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::time::Duration;

use super::callbacks::{OnRetry, ShouldRetry};
use super::{OnRetryArgs, Retry, RetryArgs, RetryConfig};
use crate::PolicyContext;
use crate::rnd::Rnd;

/// Builder for [`Retry`], created by [`Retry::builder`].
///
/// Every setting is optional. Unset values keep their [`RetryConfig`] defaults, and every
/// error is considered retryable until [`retry_if`][Self::retry_if] says otherwise.
#[derive(Debug)]
pub struct RetryBuilder<E> {
    pub(super) name: Cow<'static, str>,
    pub(super) context: PolicyContext,
    pub(super) config: RetryConfig,
    pub(super) should_retry: Option<ShouldRetry<E>>,
    pub(super) on_retry: Option<OnRetry<E>>,
    pub(super) rnd: Rnd,
}

impl<E> RetryBuilder<E> {
    pub(super) fn new(name: Cow<'static, str>) -> Self {
        Self {
            name,
            context: PolicyContext::default(),
            config: RetryConfig::default(),
            should_retry: None,
            on_retry: None,
            rnd: Rnd::default(),
        }
    }

    /// Uses the clock and telemetry settings of `context`. Backoff delays sleep on the
    /// context's clock.
    #[must_use]
    pub fn context(mut self, context: &PolicyContext) -> Self {
        self.context = context.clone();
        self
    }

    /// Replaces the whole configuration. The predicate and callback are kept.
    #[must_use]
    pub fn config(mut self, config: RetryConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the number of retries after the first attempt.
    ///
    /// **Default**: 3.
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Sets the delay before the first retry.
    ///
    /// **Default**: 100 milliseconds.
    #[must_use]
    pub fn initial_delay(mut self, initial_delay: Duration) -> Self {
        self.config.initial_delay = initial_delay;
        self
    }

    /// Sets the factor applied to the delay after every retry.
    ///
    /// **Default**: 2.0.
    #[must_use]
    pub fn backoff_multiplier(mut self, backoff_multiplier: f64) -> Self {
        self.config.backoff_multiplier = backoff_multiplier;
        self
    }

    /// Sets the upper bound of any single delay.
    ///
    /// **Default**: 30 seconds.
    #[must_use]
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.config.max_delay = max_delay;
        self
    }

    /// Enables or disables jitter.
    ///
    /// **Default**: disabled.
    #[must_use]
    pub fn use_jitter(mut self, use_jitter: bool) -> Self {
        self.config.use_jitter = use_jitter;
        self
    }

    /// Decides which errors are worth another attempt. Returning `false` surfaces the error
    /// immediately.
    ///
    /// **Default**: every error is retried.
    #[must_use]
    pub fn retry_if(mut self, predicate: impl Fn(&E, RetryArgs) -> bool + Send + Sync + 'static) -> Self {
        self.should_retry = Some(ShouldRetry::new(predicate));
        self
    }

    /// Registers a callback invoked before every backoff sleep.
    #[must_use]
    pub fn on_retry(mut self, callback: impl Fn(&E, OnRetryArgs) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(OnRetry::new(callback));
        self
    }

    #[cfg(test)]
    pub(crate) fn rnd(mut self, rnd: Rnd) -> Self {
        self.rnd = rnd;
        self
    }

    /// Builds the retry policy.
    #[must_use]
    pub fn build(self) -> Retry<E> {
        Retry::from_builder(self)
    }
}
