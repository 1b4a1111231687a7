// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::time::Duration;

use super::{Timeout, TimeoutConfig, TimeoutMode};
use crate::PolicyContext;

/// Builder for [`Timeout`], created by [`Timeout::builder`].
///
/// Every setting is optional. Unset values keep their [`TimeoutConfig`] defaults.
#[derive(Debug, Clone)]
pub struct TimeoutBuilder {
    name: Cow<'static, str>,
    context: PolicyContext,
    config: TimeoutConfig,
}

impl TimeoutBuilder {
    pub(super) fn new(name: Cow<'static, str>) -> Self {
        Self {
            name,
            context: PolicyContext::default(),
            config: TimeoutConfig::default(),
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
    pub fn config(mut self, config: TimeoutConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the time budget of a single call.
    ///
    /// **Default**: 30 seconds.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Sets how an overrun is reported.
    ///
    /// **Default**: [`TimeoutMode::Advisory`].
    #[must_use]
    pub fn mode(mut self, mode: TimeoutMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Builds the timeout policy.
    #[must_use]
    pub fn build(self) -> Timeout {
        Timeout::from_parts(self.name, self.config, &self.context)
    }
}
