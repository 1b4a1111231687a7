// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::time::Duration;

use parking_lot::Mutex;

use super::callbacks::FallbackFn;
use super::{FallbackArgs, FallbackBuilder};
use crate::utils::TelemetryHelper;
use crate::{Clock, NotSet, PolicyContext};

/// A snapshot of a [`Fallback`] policy's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub struct FallbackStats {
    /// Calls to [`Fallback::execute`].
    pub total_invocations: u64,
    /// Calls whose operation failed and were answered by the fallback.
    pub fallback_used: u64,
}

/// Replaces the error of a failed operation with a substitute value.
///
/// See the [module documentation][super] for details.
#[derive(Debug)]
pub struct Fallback<T, E> {
    name: Cow<'static, str>,
    clock: Clock,
    action: FallbackFn<T, E>,
    stats: Mutex<FallbackStats>,
    telemetry: TelemetryHelper,
}

impl<T, E> Fallback<T, E> {
    /// Starts building a fallback policy. Prefer `snake_case` names.
    #[must_use]
    pub fn builder(name: impl Into<Cow<'static, str>>) -> FallbackBuilder<T, E, NotSet> {
        FallbackBuilder::new(name.into())
    }

    pub(super) fn from_parts(name: Cow<'static, str>, context: &PolicyContext, action: FallbackFn<T, E>) -> Self {
        Self {
            telemetry: context.create_telemetry(name.clone()),
            clock: context.clock().clone(),
            stats: Mutex::new(FallbackStats::default()),
            name,
            action,
        }
    }

    /// Runs `operation` and returns its value, or the substitute when it fails.
    ///
    /// The counters are updated before the fallback action runs, so a panicking action
    /// still counts as a fallback use. Its panic propagates to the caller.
    pub fn execute<F>(&self, operation: F) -> T
    where
        F: FnOnce() -> Result<T, E>,
    {
        let stopwatch = self.clock.stopwatch();
        let result = operation();

        let mut stats = self.stats.lock();
        stats.total_invocations += 1;

        match result {
            Ok(value) => value,
            Err(error) => {
                stats.fallback_used += 1;
                drop(stats);

                let elapsed = stopwatch.elapsed();
                self.emit_telemetry(elapsed);
                self.action.call(error, FallbackArgs { elapsed })
            }
        }
    }

    /// Returns a snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> FallbackStats {
        *self.stats.lock()
    }

    /// Clears the counters.
    pub fn reset(&self) {
        *self.stats.lock() = FallbackStats::default();
    }

    /// Returns the name of this policy.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[cfg_attr(
        not(any(feature = "logs", feature = "metrics", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when neither logs nor metrics are enabled")
    )]
    #[cfg_attr(
        all(feature = "metrics", not(any(feature = "logs", test))),
        expect(unused_variables, reason = "elapsed is only logged")
    )]
    fn emit_telemetry(&self, elapsed: Duration) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled {
            tracing::event!(
                name: "bulwark.fallback",
                tracing::Level::WARN,
                resilience.pipeline.name = %self.telemetry.pipeline_name,
                resilience.strategy.name = %self.telemetry.strategy_name,
                resilience.event.name = crate::telemetry::FALLBACK,
                resilience.operation.elapsed = elapsed.as_secs_f32(),
            );
        }

        #[cfg(any(feature = "metrics", test))]
        if self.telemetry.metrics_enabled() {
            self.telemetry.report_event(crate::telemetry::FALLBACK, &[]);
        }
    }
}
