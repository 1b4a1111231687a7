// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::time::Duration;

use parking_lot::Mutex;

use super::{Deadline, TimeoutBuilder, TimeoutConfig, TimeoutMode};
use crate::utils::TelemetryHelper;
use crate::{Clock, Error, PolicyContext, PolicyError, Stopwatch};

/// A snapshot of a [`Timeout`]'s counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub struct TimeoutStats {
    /// Calls that completed, whatever their outcome.
    pub total_operations: u64,
    /// Calls that succeeded within their budget.
    pub successful_operations: u64,
    /// Calls that took longer than their budget.
    pub timed_out_operations: u64,
    /// Calls that failed within their budget.
    pub failed_operations: u64,
    /// Sum of the execution time of every call.
    pub total_execution_time: Duration,
    /// Longest execution time observed.
    pub max_execution_time: Duration,
}

impl TimeoutStats {
    /// Returns the mean execution time, or zero when nothing ran yet.
    #[must_use]
    pub fn average_execution_time(&self) -> Duration {
        u32::try_from(self.total_operations)
            .ok()
            .and_then(|count| self.total_execution_time.checked_div(count))
            .unwrap_or_default()
    }

    fn record(&mut self, elapsed: Duration, timed_out: bool, succeeded: bool) {
        self.total_operations += 1;
        self.total_execution_time = self.total_execution_time.saturating_add(elapsed);
        self.max_execution_time = self.max_execution_time.max(elapsed);

        if timed_out {
            self.timed_out_operations += 1;
        } else if succeeded {
            self.successful_operations += 1;
        } else {
            self.failed_operations += 1;
        }
    }
}

/// Measures how long operations take and flags those that overran their budget.
///
/// See the [module documentation][super] for the execution model.
#[derive(Debug)]
pub struct Timeout {
    name: Cow<'static, str>,
    config: TimeoutConfig,
    clock: Clock,
    stats: Mutex<TimeoutStats>,
    telemetry: TelemetryHelper,
}

impl Timeout {
    /// Creates a timeout policy with a default [`PolicyContext`].
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, config: TimeoutConfig) -> Self {
        Self::builder(name).config(config).build()
    }

    /// Starts building a timeout policy. Prefer `snake_case` names.
    #[must_use]
    pub fn builder(name: impl Into<Cow<'static, str>>) -> TimeoutBuilder {
        TimeoutBuilder::new(name.into())
    }

    pub(super) fn from_parts(name: Cow<'static, str>, config: TimeoutConfig, context: &PolicyContext) -> Self {
        Self {
            telemetry: context.create_telemetry(name.clone()),
            clock: context.clock().clone(),
            stats: Mutex::new(TimeoutStats::default()),
            name,
            config,
        }
    }

    /// Runs `operation` to completion and classifies it by how long it took.
    ///
    /// The operation is never interrupted. A call is timed out when its elapsed time is
    /// strictly greater than the budget, whatever its outcome. In
    /// [`Advisory`][TimeoutMode::Advisory] mode the operation's result is returned as is; in
    /// [`Strict`][TimeoutMode::Strict] mode a timed-out call returns
    /// [`PolicyError::OperationTimeout`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Operation`] when the operation fails, or [`Error::Policy`] when the
    /// call timed out in strict mode.
    pub fn execute<T, E, F>(&self, operation: F) -> Result<T, Error<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.execute_with_deadline(|_| operation())
    }

    /// Like [`execute`][Self::execute], but hands the operation its [`Deadline`] so that it
    /// can check the remaining budget and stop early on its own.
    ///
    /// # Errors
    ///
    /// Same as [`execute`][Self::execute].
    pub fn execute_with_deadline<T, E, F>(&self, operation: F) -> Result<T, Error<E>>
    where
        F: FnOnce(&Deadline) -> Result<T, E>,
    {
        let deadline = self.deadline();
        let mut guard = FailOnUnwind {
            timeout: self,
            stopwatch: self.clock.stopwatch(),
            armed: true,
        };
        let result = operation(&deadline);
        guard.armed = false;
        let elapsed = guard.stopwatch.elapsed();

        let timed_out = self.record(elapsed, result.is_ok());

        if !timed_out {
            return result.map_err(Error::Operation);
        }

        self.emit_telemetry(elapsed);

        match self.config.mode {
            TimeoutMode::Strict => Err(Error::Policy(PolicyError::OperationTimeout {
                name: self.name.clone(),
                timeout: self.config.timeout,
                elapsed,
            })),
            TimeoutMode::Advisory => result.map_err(Error::Operation),
        }
    }

    /// Returns a fresh deadline one budget from now.
    #[must_use]
    pub fn deadline(&self) -> Deadline {
        Deadline::with_clock(&self.clock, self.config.timeout)
    }

    /// Returns a snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> TimeoutStats {
        *self.stats.lock()
    }

    /// Clears the counters.
    pub fn reset(&self) {
        *self.stats.lock() = TimeoutStats::default();
    }

    /// Returns the name of this policy.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration of this policy.
    #[must_use]
    pub fn config(&self) -> &TimeoutConfig {
        &self.config
    }

    /// Updates the counters and returns whether the call overran its budget.
    fn record(&self, elapsed: Duration, succeeded: bool) -> bool {
        let timed_out = elapsed > self.config.timeout;
        self.stats.lock().record(elapsed, timed_out, succeeded);
        timed_out
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, reason = "elapsed time is only logged")
    )]
    #[cfg_attr(
        not(any(feature = "logs", feature = "metrics", test)),
        expect(clippy::unused_self, reason = "unused when neither logs nor metrics are enabled")
    )]
    fn emit_telemetry(&self, elapsed: Duration) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled {
            tracing::event!(
                name: "bulwark.timeout",
                tracing::Level::WARN,
                resilience.pipeline.name = %self.telemetry.pipeline_name,
                resilience.strategy.name = %self.telemetry.strategy_name,
                resilience.event.name = crate::telemetry::TIMEOUT,
                resilience.timeout = self.config.timeout.as_secs_f32(),
                resilience.elapsed = elapsed.as_secs_f32(),
                resilience.timeout.mode = self.config.mode.as_str(),
            );
        }

        #[cfg(any(feature = "metrics", test))]
        if self.telemetry.metrics_enabled() {
            self.telemetry.report_event(
                crate::telemetry::TIMEOUT,
                &[opentelemetry::KeyValue::new("resilience.timeout.mode", self.config.mode.as_str())],
            );
        }
    }
}

/// Records a failed call if the operation unwinds.
struct FailOnUnwind<'a> {
    timeout: &'a Timeout,
    stopwatch: Stopwatch,
    armed: bool,
}

impl Drop for FailOnUnwind<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.timeout.record(self.stopwatch.elapsed(), false);
        }
    }
}
