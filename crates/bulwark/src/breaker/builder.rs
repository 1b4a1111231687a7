// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::time::Duration;

use super::callbacks::OnTransition;
use super::{BreakerConfig, CircuitBreaker, TransitionArgs};
use crate::PolicyContext;

/// Builder for [`CircuitBreaker`], created by [`CircuitBreaker::builder`].
///
/// Every setting is optional. Unset values keep their [`BreakerConfig`] defaults.
#[derive(Debug)]
pub struct CircuitBreakerBuilder {
    pub(super) name: Cow<'static, str>,
    pub(super) context: PolicyContext,
    pub(super) config: BreakerConfig,
    pub(super) on_opened: Option<OnTransition>,
    pub(super) on_closed: Option<OnTransition>,
    pub(super) on_half_opened: Option<OnTransition>,
}

impl CircuitBreakerBuilder {
    pub(super) fn new(name: Cow<'static, str>) -> Self {
        Self {
            name,
            context: PolicyContext::default(),
            config: BreakerConfig::default(),
            on_opened: None,
            on_closed: None,
            on_half_opened: None,
        }
    }

    /// Uses the clock and telemetry settings of `context`.
    #[must_use]
    pub fn context(mut self, context: &PolicyContext) -> Self {
        self.context = context.clone();
        self
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: BreakerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the number of consecutive failures that open the circuit.
    ///
    /// **Default**: 5.
    #[must_use]
    pub fn failure_threshold(mut self, failure_threshold: u32) -> Self {
        self.config.failure_threshold = failure_threshold;
        self
    }

    /// Sets the number of consecutive half-open successes that close the circuit.
    ///
    /// **Default**: 2.
    #[must_use]
    pub fn success_threshold(mut self, success_threshold: u32) -> Self {
        self.config.success_threshold = success_threshold;
        self
    }

    /// Sets how long the circuit stays open before admitting probes.
    ///
    /// **Default**: 5 seconds.
    #[must_use]
    pub fn open_timeout(mut self, open_timeout: Duration) -> Self {
        self.config.open_timeout = open_timeout;
        self
    }

    /// Sets how many probes may run at once while half-open.
    ///
    /// **Default**: 1.
    #[must_use]
    pub fn half_open_max_probes(mut self, half_open_max_probes: u32) -> Self {
        self.config.half_open_max_probes = half_open_max_probes;
        self
    }

    /// Registers a callback invoked every time the circuit opens.
    ///
    /// Callbacks run on the thread that caused the transition, after the breaker's lock has
    /// been released. This call replaces any previous callback.
    #[must_use]
    pub fn on_opened(mut self, callback: impl Fn(TransitionArgs) + Send + Sync + 'static) -> Self {
        self.on_opened = Some(OnTransition::new(callback));
        self
    }

    /// Registers a callback invoked every time the circuit closes.
    #[must_use]
    pub fn on_closed(mut self, callback: impl Fn(TransitionArgs) + Send + Sync + 'static) -> Self {
        self.on_closed = Some(OnTransition::new(callback));
        self
    }

    /// Registers a callback invoked every time the circuit becomes half-open.
    #[must_use]
    pub fn on_half_opened(mut self, callback: impl Fn(TransitionArgs) + Send + Sync + 'static) -> Self {
        self.on_half_opened = Some(OnTransition::new(callback));
        self
    }

    /// Builds the circuit breaker, starting closed.
    #[must_use]
    pub fn build(self) -> CircuitBreaker {
        CircuitBreaker::from_builder(self)
    }
}
