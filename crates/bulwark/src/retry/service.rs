// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::time::Duration;

use parking_lot::Mutex;

use super::backoff::Backoff;
use super::callbacks::{OnRetry, ShouldRetry};
use super::{Attempt, OnRetryArgs, RetryArgs, RetryBuilder, RetryConfig};
use crate::Clock;
use crate::utils::TelemetryHelper;

/// The outcome of [`Retry::execute_detailed`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct RetryResult<T, E> {
    /// Number of times the operation ran.
    pub attempts: u32,
    /// The successful value, or the error of the last attempt.
    pub result: Result<T, E>,
}

impl<T, E> RetryResult<T, E> {
    /// Discards the attempt count.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt when no attempt succeeded.
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// A snapshot of a [`Retry`] policy's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub struct RetryStats {
    /// Calls to `execute` or `execute_detailed`.
    pub executions: u64,
    /// Times the operation ran, across every execution.
    pub attempts: u64,
    /// Backoff sleeps taken, one per retry.
    pub retries: u64,
    /// Executions that ended with a successful attempt.
    pub successes: u64,
    /// Executions that failed on their last allowed attempt.
    pub exhausted: u64,
    /// Executions stopped early because the error was not retryable.
    pub aborted: u64,
}

enum Outcome {
    Success,
    Exhausted,
    Aborted,
}

/// Re-runs failed operations with exponential backoff.
///
/// See the [module documentation][super] for the retry algorithm.
#[derive(Debug)]
pub struct Retry<E> {
    name: Cow<'static, str>,
    config: RetryConfig,
    clock: Clock,
    backoff: Backoff,
    should_retry: Option<ShouldRetry<E>>,
    on_retry: Option<OnRetry<E>>,
    stats: Mutex<RetryStats>,
    telemetry: TelemetryHelper,
}

impl<E> Retry<E> {
    /// Creates a retry policy that retries every error, with a default
    /// [`PolicyContext`][crate::PolicyContext].
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, config: RetryConfig) -> Self {
        Self::builder(name).config(config).build()
    }

    /// Starts building a retry policy. Prefer `snake_case` names.
    #[must_use]
    pub fn builder(name: impl Into<Cow<'static, str>>) -> RetryBuilder<E> {
        RetryBuilder::new(name.into())
    }

    pub(super) fn from_builder(builder: RetryBuilder<E>) -> Self {
        Self {
            telemetry: builder.context.create_telemetry(builder.name.clone()),
            clock: builder.context.clock().clone(),
            backoff: Backoff::new(&builder.config, builder.rnd),
            name: builder.name,
            config: builder.config,
            should_retry: builder.should_retry,
            on_retry: builder.on_retry,
            stats: Mutex::new(RetryStats::default()),
        }
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error, or has run
    /// `max_retries + 1` times.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt.
    pub fn execute<T, F>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        self.execute_detailed(operation).result
    }

    /// Like [`execute`][Self::execute], but also reports how many attempts were made.
    #[cfg_attr(test, mutants::skip)] // causes test timeout
    pub fn execute_detailed<T, F>(&self, mut operation: F) -> RetryResult<T, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        let max_retries = self.config.max_retries;
        let mut delays = self.backoff.delays();
        let mut attempt = Attempt::first(max_retries);
        let mut attempts = 0_u32;

        loop {
            let result = operation();
            attempts = attempts.saturating_add(1);

            let error = match result {
                Ok(value) => {
                    self.record(attempts, Outcome::Success);
                    return RetryResult {
                        attempts,
                        result: Ok(value),
                    };
                }
                Err(error) => error,
            };

            if attempt.is_last() {
                self.record(attempts, Outcome::Exhausted);
                self.emit_telemetry(attempt, Duration::ZERO);
                return RetryResult {
                    attempts,
                    result: Err(error),
                };
            }

            if !self.is_retryable(&error, attempt) {
                self.record(attempts, Outcome::Aborted);
                return RetryResult {
                    attempts,
                    result: Err(error),
                };
            }

            let delay = delays.next().unwrap_or_default();

            if let Some(on_retry) = &self.on_retry {
                on_retry.call(&error, OnRetryArgs { attempt, delay });
            }
            self.emit_telemetry(attempt, delay);

            self.clock.sleep(delay);
            attempt = attempt.next(max_retries);
        }
    }

    /// Returns the nominal backoff schedule: the delay slept before each of the
    /// `max_retries` retries. With jitter enabled every call draws new delays.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        self.backoff
            .delays()
            .take(usize::try_from(self.config.max_retries).unwrap_or(usize::MAX))
    }

    /// Returns a snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> RetryStats {
        *self.stats.lock()
    }

    /// Clears the counters.
    pub fn reset(&self) {
        *self.stats.lock() = RetryStats::default();
    }

    /// Returns the name of this policy.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration of this policy.
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    fn is_retryable(&self, error: &E, attempt: Attempt) -> bool {
        self.should_retry
            .as_ref()
            .is_none_or(|predicate| predicate.call(error, RetryArgs { attempt }))
    }

    fn record(&self, attempts: u32, outcome: Outcome) {
        let mut stats = self.stats.lock();
        stats.executions += 1;
        stats.attempts += u64::from(attempts);
        stats.retries += u64::from(attempts.saturating_sub(1));

        match outcome {
            Outcome::Success => stats.successes += 1,
            Outcome::Exhausted => stats.exhausted += 1,
            Outcome::Aborted => stats.aborted += 1,
        }
    }

    #[cfg_attr(
        not(any(feature = "logs", feature = "metrics", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when neither logs nor metrics are enabled")
    )]
    #[cfg_attr(
        all(feature = "metrics", not(any(feature = "logs", test))),
        expect(unused_variables, reason = "delay is only logged")
    )]
    fn emit_telemetry(&self, attempt: Attempt, delay: Duration) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled {
            tracing::event!(
                name: "bulwark.retry",
                tracing::Level::WARN,
                resilience.pipeline.name = %self.telemetry.pipeline_name,
                resilience.strategy.name = %self.telemetry.strategy_name,
                resilience.event.name = crate::telemetry::RETRY,
                resilience.attempt.index = attempt.index(),
                resilience.attempt.is_last = attempt.is_last(),
                resilience.retry.delay = delay.as_secs_f32(),
            );
        }

        #[cfg(any(feature = "metrics", test))]
        if self.telemetry.metrics_enabled() {
            self.telemetry.report_event(
                crate::telemetry::RETRY,
                &[
                    opentelemetry::KeyValue::new("resilience.attempt.index", i64::from(attempt.index())),
                    opentelemetry::KeyValue::new("resilience.attempt.is_last", attempt.is_last()),
                ],
            );
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use opentelemetry::KeyValue;

    use super::*;
    use crate::rnd::Rnd;
    use crate::testing::{LogCapture, MetricTester};
    use crate::{ClockControl, PolicyContext};

    fn retry(control: &ClockControl, max_retries: u32) -> Retry<String> {
        Retry::builder("test_retry")
            .context(&PolicyContext::new(control.to_clock()))
            .max_retries(max_retries)
            .initial_delay(Duration::from_millis(100))
            .backoff_multiplier(2.0)
            .build()
    }

    #[test]
    fn assert_types() {
        static_assertions::assert_impl_all!(Retry<String>: Send, Sync, std::fmt::Debug);
        static_assertions::assert_impl_all!(Retry<std::rc::Rc<u32>>: Send, Sync);
    }

    #[test]
    fn success_returns_immediately() {
        let control = ClockControl::new();
        let retry = retry(&control, 3);

        let result = retry.execute_detailed(|| Ok::<_, String>(1));

        assert_eq!(result, RetryResult { attempts: 1, result: Ok(1) });
        assert_eq!(control.elapsed(), Duration::ZERO);
    }

    #[test]
    fn fails_twice_then_succeeds() {
        let control = ClockControl::new();
        let delays = Arc::new(Mutex::new(Vec::new()));
        let delays_clone = Arc::clone(&delays);
        let retry = Retry::builder("test_retry")
            .context(&PolicyContext::new(control.to_clock()))
            .max_retries(2)
            .on_retry(move |_: &String, args| delays_clone.lock().push(args.delay()))
            .build();
        let mut calls = 0;

        let result = retry.execute_detailed(|| {
            calls += 1;
            if calls < 3 { Err(format!("failure {calls}")) } else { Ok("done") }
        });

        assert_eq!(result.attempts, 3);
        assert_eq!(result.into_result(), Ok("done"));
        assert_eq!(*delays.lock(), vec![Duration::from_millis(100), Duration::from_millis(200)]);
        assert_eq!(control.elapsed(), Duration::from_millis(300));
    }

    #[test]
    fn always_failing_runs_max_retries_plus_one() {
        let control = ClockControl::new();
        let retry = retry(&control, 4);
        let mut calls = 0;

        let result = retry.execute(|| {
            calls += 1;
            Err::<(), _>(format!("failure {calls}"))
        });

        assert_eq!(result, Err("failure 5".to_string()));
        assert_eq!(calls, 5);
        assert_eq!(control.elapsed(), Duration::from_millis(100 + 200 + 400 + 800));

        let stats = retry.stats();
        assert_eq!(stats.executions, 1);
        assert_eq!(stats.attempts, 5);
        assert_eq!(stats.retries, 4);
        assert_eq!(stats.exhausted, 1);
    }

    #[test]
    fn zero_retries_runs_once() {
        let control = ClockControl::new();
        let retry = retry(&control, 0);

        let result = retry.execute_detailed(|| Err::<(), _>("boom".to_string()));

        assert_eq!(result.attempts, 1);
        assert_eq!(control.elapsed(), Duration::ZERO);
    }

    #[test]
    fn non_retryable_error_stops() {
        let control = ClockControl::new();
        let retry = Retry::builder("test_retry")
            .context(&PolicyContext::new(control.to_clock()))
            .retry_if(|error: &String, _| error != "fatal")
            .build();

        let result = retry.execute_detailed(|| Err::<(), _>("fatal".to_string()));

        assert_eq!(result.attempts, 1);
        assert_eq!(retry.stats().aborted, 1);
        assert_eq!(control.elapsed(), Duration::ZERO);
    }

    #[test]
    fn predicate_sees_attempts() {
        let control = ClockControl::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let retry = Retry::builder("test_retry")
            .context(&PolicyContext::new(control.to_clock()))
            .max_retries(2)
            .retry_if(move |_: &String, args| {
                seen_clone.lock().push(args.attempt().index());
                true
            })
            .build();

        let _ = retry.execute(|| Err::<(), _>("boom".to_string()));

        // The last attempt is never offered to the predicate.
        assert_eq!(*seen.lock(), vec![0, 1]);
    }

    #[test]
    fn delays_are_capped() {
        let control = ClockControl::new();
        let retry = Retry::<String>::builder("capped")
            .context(&PolicyContext::new(control.to_clock()))
            .max_retries(5)
            .initial_delay(Duration::from_secs(1))
            .backoff_multiplier(10.0)
            .max_delay(Duration::from_secs(30))
            .build();

        let delays: Vec<_> = retry.delays().collect();

        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(10),
                Duration::from_secs(30),
                Duration::from_secs(30),
                Duration::from_secs(30),
            ]
        );
    }

    #[test]
    fn jitter_is_applied_to_sleeps() {
        let control = ClockControl::new();
        let retry = Retry::builder("jittered")
            .context(&PolicyContext::new(control.to_clock()))
            .max_retries(1)
            .initial_delay(Duration::from_millis(100))
            .use_jitter(true)
            .rnd(Rnd::new_fixed(1.0))
            .build();

        let _ = retry.execute(|| Err::<(), _>("boom".to_string()));

        let slept_ms = control.elapsed().as_secs_f64() * 1_000.0;
        assert!((slept_ms - 125.0).abs() < 0.001, "slept {slept_ms}ms");
    }

    #[test]
    fn stats_accumulate_and_reset() {
        let control = ClockControl::new();
        let retry = retry(&control, 1);

        let _ = retry.execute(|| Ok::<_, String>(()));
        let _ = retry.execute(|| Err::<(), _>("boom".to_string()));

        assert_eq!(
            retry.stats(),
            RetryStats {
                executions: 2,
                attempts: 3,
                retries: 1,
                successes: 1,
                exhausted: 1,
                aborted: 0,
            }
        );

        retry.reset();
        assert_eq!(retry.stats(), RetryStats::default());
    }

    #[test]
    fn accessors() {
        let retry = Retry::<String>::new("named", RetryConfig::default().max_retries(7));

        assert_eq!(retry.name(), "named");
        assert_eq!(retry.config().max_retries, 7);
        assert_eq!(retry.delays().count(), 7);
    }

    #[test]
    fn retry_emits_telemetry() {
        let control = ClockControl::new();
        let tester = MetricTester::new();
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        let context = PolicyContext::new(control.to_clock())
            .name("log_test_pipeline")
            .enable_logs()
            .enable_metrics(tester.meter_provider());
        let retry = Retry::builder("log_test_retry").context(&context).max_retries(1).build();

        let _ = retry.execute(|| Err::<(), _>("boom".to_string()));

        capture.assert_contains("bulwark::retry");
        capture.assert_contains("log_test_pipeline");
        capture.assert_contains("log_test_retry");
        capture.assert_contains("resilience.attempt.index");
        capture.assert_contains("resilience.retry.delay");
        tester.assert_attributes_contain(&[
            KeyValue::new("resilience.event.name", "retry"),
            KeyValue::new("resilience.attempt.index", 0_i64),
            KeyValue::new("resilience.attempt.is_last", false),
            KeyValue::new("resilience.attempt.index", 1_i64),
            KeyValue::new("resilience.attempt.is_last", true),
        ]);
    }
}
