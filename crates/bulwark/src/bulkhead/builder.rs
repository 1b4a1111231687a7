// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::time::Duration;

use super::{Bulkhead, BulkheadConfig, RejectionPolicy};
use crate::PolicyContext;

/// Builder for [`Bulkhead`], created by [`Bulkhead::builder`].
///
/// Every setting is optional. Unset values keep their [`BulkheadConfig`] defaults.
#[derive(Debug, Clone)]
pub struct BulkheadBuilder {
    name: Cow<'static, str>,
    context: PolicyContext,
    config: BulkheadConfig,
}

impl BulkheadBuilder {
    pub(super) fn new(name: Cow<'static, str>) -> Self {
        Self {
            name,
            context: PolicyContext::default(),
            config: BulkheadConfig::default(),
        }
    }

    /// Uses the telemetry settings of `context`.
    #[must_use]
    pub fn context(mut self, context: &PolicyContext) -> Self {
        self.context = context.clone();
        self
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: BulkheadConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the number of calls allowed to run at once.
    ///
    /// **Default**: 10.
    #[must_use]
    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.config.max_concurrent = max_concurrent;
        self
    }

    /// Sets the number of callers allowed to queue.
    ///
    /// **Default**: 0.
    #[must_use]
    pub fn max_waiting(mut self, max_waiting: usize) -> Self {
        self.config.max_waiting = max_waiting;
        self
    }

    /// Sets the longest time a queued caller waits. Zero waits without bound.
    ///
    /// **Default**: zero.
    #[must_use]
    pub fn max_wait_duration(mut self, max_wait_duration: Duration) -> Self {
        self.config.max_wait_duration = max_wait_duration;
        self
    }

    /// Sets what happens to a caller when every slot is taken.
    ///
    /// **Default**: [`RejectionPolicy::FailFast`].
    #[must_use]
    pub fn rejection_policy(mut self, rejection_policy: RejectionPolicy) -> Self {
        self.config.rejection_policy = rejection_policy;
        self
    }

    /// Builds the bulkhead.
    #[must_use]
    pub fn build(self) -> Bulkhead {
        Bulkhead::from_parts(self.name, self.config, &self.context)
    }
}
