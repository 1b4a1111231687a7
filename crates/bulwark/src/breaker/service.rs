// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;

use parking_lot::Mutex;

use super::callbacks::OnTransition;
use super::state::{Admission, BreakerCore, Transition};
use super::{BreakerConfig, BreakerStats, CircuitBreakerBuilder, CircuitState, TransitionArgs};
use crate::utils::TelemetryHelper;
use crate::{Clock, Error, PolicyError};

/// Stops calling a dependency after repeated failures and probes it for recovery.
///
/// See the [module documentation][super] for the state machine.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: Cow<'static, str>,
    config: BreakerConfig,
    clock: Clock,
    core: Mutex<BreakerCore>,
    telemetry: TelemetryHelper,
    on_opened: Option<OnTransition>,
    on_closed: Option<OnTransition>,
    on_half_opened: Option<OnTransition>,
}

impl CircuitBreaker {
    /// Creates a circuit breaker with a default [`PolicyContext`][crate::PolicyContext].
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, config: BreakerConfig) -> Self {
        Self::builder(name).config(config).build()
    }

    /// Starts building a circuit breaker. Prefer `snake_case` names.
    #[must_use]
    pub fn builder(name: impl Into<Cow<'static, str>>) -> CircuitBreakerBuilder {
        CircuitBreakerBuilder::new(name.into())
    }

    pub(super) fn from_builder(builder: CircuitBreakerBuilder) -> Self {
        let config = builder.config.normalized();
        let clock = builder.context.clock().clone();

        Self {
            telemetry: builder.context.create_telemetry(builder.name.clone()),
            core: Mutex::new(BreakerCore::new(config, clock.instant())),
            name: builder.name,
            config,
            clock,
            on_opened: builder.on_opened,
            on_closed: builder.on_closed,
            on_half_opened: builder.on_half_opened,
        }
    }

    /// Decides whether a call may proceed, and counts it.
    ///
    /// An open circuit whose open timeout has elapsed becomes half-open first. While
    /// half-open, at most `half_open_max_probes` admitted calls may be outstanding; an
    /// admitted call must be followed by [`record_success`][Self::record_success] or
    /// [`record_failure`][Self::record_failure].
    #[must_use]
    pub fn allow_request(&self) -> bool {
        self.admit().is_some()
    }

    /// Records a successful call.
    ///
    /// The breaker cannot tell which call is being recorded. While half-open every recorded
    /// success is treated as a completed probe, so recording the outcome of a call admitted
    /// before the circuit opened lets in one probe too many. [`execute`][Self::execute]
    /// tracks each call's admission and is not affected.
    pub fn record_success(&self) {
        self.record(Admission::Untracked, true);
    }

    /// Records a failed call.
    ///
    /// While half-open this is treated as a failed probe, see
    /// [`record_success`][Self::record_success].
    pub fn record_failure(&self) {
        self.record(Admission::Untracked, false);
    }

    /// Runs `operation` if the circuit admits it and records its outcome.
    ///
    /// A panicking operation is recorded as a failure before the panic continues.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::CircuitOpen`] without running the operation when the circuit
    /// rejects the call, or [`Error::Operation`] when the operation fails.
    pub fn execute<T, E, F>(&self, operation: F) -> Result<T, Error<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let Some(admission) = self.admit() else {
            return Err(Error::Policy(PolicyError::CircuitOpen { name: self.name.clone() }));
        };

        let mut guard = FailOnUnwind {
            breaker: self,
            admission,
            armed: true,
        };
        let result = operation();
        guard.armed = false;

        self.record(admission, result.is_ok());

        result.map_err(Error::Operation)
    }

    /// Returns the current state, moving an expired open circuit to half-open first.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        let mut core = self.core.lock();
        let transition = core.poll(self.clock.instant());
        let state = core.stats().state;
        drop(core);

        self.notify(transition);
        state
    }

    /// Returns `true` when the circuit is closed.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    /// Returns a snapshot of the state and counters.
    #[must_use]
    pub fn stats(&self) -> BreakerStats {
        let mut core = self.core.lock();
        let transition = core.poll(self.clock.instant());
        let stats = core.stats();
        drop(core);

        self.notify(transition);
        stats
    }

    /// Returns the breaker to the closed state and clears every counter.
    pub fn reset(&self) {
        self.core.lock().reset(self.clock.instant());
    }

    /// Opens the circuit and keeps it open, regardless of the open timeout, until
    /// [`force_close`][Self::force_close] or [`reset`][Self::reset] is called.
    pub fn force_open(&self) {
        let transition = self.core.lock().force_open(self.clock.instant());
        self.notify(transition);
    }

    /// Closes the circuit and clears the failure streak.
    pub fn force_close(&self) {
        let transition = self.core.lock().force_close(self.clock.instant());
        self.notify(transition);
    }

    /// Returns the name of this breaker.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration, after clamping.
    #[must_use]
    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    fn admit(&self) -> Option<Admission> {
        let (admission, transition) = self.core.lock().try_enter(self.clock.instant());

        self.notify(transition);

        if admission.is_none() {
            self.emit_rejected();
        }

        admission
    }

    fn record(&self, admission: Admission, succeeded: bool) {
        let now = self.clock.instant();
        let mut core = self.core.lock();
        let transition = if succeeded {
            core.on_success(now, admission)
        } else {
            core.on_failure(now, admission)
        };
        drop(core);

        self.notify(transition);
    }

    fn notify(&self, transition: Option<Transition>) {
        let Some(transition) = transition else {
            return;
        };

        self.emit_transition(transition);

        let callback = match transition.to {
            CircuitState::Open => self.on_opened.as_ref(),
            CircuitState::Closed => self.on_closed.as_ref(),
            CircuitState::HalfOpen => self.on_half_opened.as_ref(),
        };

        if let Some(callback) = callback {
            callback.call(TransitionArgs {
                from: transition.from,
                to: transition.to,
                consecutive_failures: transition.consecutive_failures,
            });
        }
    }

    #[cfg_attr(
        not(any(feature = "logs", feature = "metrics", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when neither logs nor metrics are enabled")
    )]
    fn emit_transition(&self, transition: Transition) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled {
            match transition.to {
                CircuitState::Open => tracing::event!(
                    name: "bulwark.breaker",
                    tracing::Level::WARN,
                    resilience.pipeline.name = %self.telemetry.pipeline_name,
                    resilience.strategy.name = %self.telemetry.strategy_name,
                    resilience.event.name = crate::telemetry::CIRCUIT_OPENED,
                    circuit_breaker.previous_state = transition.from.as_str(),
                    circuit_breaker.state = transition.to.as_str(),
                    circuit_breaker.consecutive_failures = transition.consecutive_failures,
                ),
                CircuitState::HalfOpen | CircuitState::Closed => tracing::event!(
                    name: "bulwark.breaker",
                    tracing::Level::INFO,
                    resilience.pipeline.name = %self.telemetry.pipeline_name,
                    resilience.strategy.name = %self.telemetry.strategy_name,
                    resilience.event.name = transition_event(transition.to),
                    circuit_breaker.previous_state = transition.from.as_str(),
                    circuit_breaker.state = transition.to.as_str(),
                ),
            }
        }

        #[cfg(any(feature = "metrics", test))]
        if self.telemetry.metrics_enabled() {
            self.telemetry.report_event(
                transition_event(transition.to),
                &[opentelemetry::KeyValue::new("circuit_breaker.previous_state", transition.from.as_str())],
            );
        }
    }

    #[cfg_attr(
        not(any(feature = "logs", feature = "metrics", test)),
        expect(clippy::unused_self, reason = "unused when neither logs nor metrics are enabled")
    )]
    fn emit_rejected(&self) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled {
            tracing::event!(
                name: "bulwark.breaker",
                tracing::Level::WARN,
                resilience.pipeline.name = %self.telemetry.pipeline_name,
                resilience.strategy.name = %self.telemetry.strategy_name,
                resilience.event.name = crate::telemetry::CIRCUIT_REJECTED,
            );
        }

        #[cfg(any(feature = "metrics", test))]
        if self.telemetry.metrics_enabled() {
            self.telemetry.report_event(crate::telemetry::CIRCUIT_REJECTED, &[]);
        }
    }
}

#[cfg(any(feature = "logs", feature = "metrics", test))]
fn transition_event(to: CircuitState) -> &'static str {
    match to {
        CircuitState::Open => crate::telemetry::CIRCUIT_OPENED,
        CircuitState::HalfOpen => crate::telemetry::CIRCUIT_HALF_OPENED,
        CircuitState::Closed => crate::telemetry::CIRCUIT_CLOSED,
    }
}

/// Records a failure if the operation unwinds before the outcome is known.
struct FailOnUnwind<'a> {
    breaker: &'a CircuitBreaker,
    admission: Admission,
    armed: bool,
}

impl Drop for FailOnUnwind<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.record(self.admission, false);
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use opentelemetry::KeyValue;

    use super::*;
    use crate::testing::{LogCapture, MetricTester};
    use crate::{ClockControl, PolicyContext};

    fn breaker(control: &ClockControl, failure_threshold: u32) -> CircuitBreaker {
        CircuitBreaker::builder("test_breaker")
            .context(&PolicyContext::new(control.to_clock()))
            .failure_threshold(failure_threshold)
            .success_threshold(2)
            .open_timeout(Duration::from_secs(5))
            .build()
    }

    fn fail(breaker: &CircuitBreaker) -> Result<(), Error<&'static str>> {
        breaker.execute(|| Err("boom"))
    }

    #[test]
    fn assert_types() {
        static_assertions::assert_impl_all!(CircuitBreaker: Send, Sync, std::fmt::Debug);
        static_assertions::assert_impl_all!(CircuitBreakerBuilder: Send, Sync);
    }

    #[test]
    fn opens_after_threshold_and_rejects() {
        let control = ClockControl::new();
        let breaker = breaker(&control, 3);

        for _ in 0..3 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        let runs = AtomicU32::new(0);
        let result = breaker.execute(|| {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(())
        });

        assert_eq!(
            result,
            Err(Error::Policy(PolicyError::CircuitOpen {
                name: "test_breaker".into()
            }))
        );
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(breaker.stats().rejected_requests, 1);
    }

    #[test]
    fn operation_error_passes_through() {
        let control = ClockControl::new();
        let breaker = breaker(&control, 3);

        assert_eq!(fail(&breaker), Err(Error::Operation("boom")));
        assert_eq!(breaker.execute(|| Ok::<_, &str>(9)), Ok(9));

        let stats = breaker.stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.failed_requests, 1);
        assert_eq!(stats.successful_requests, 1);
        assert_eq!(stats.consecutive_failures, 0);
    }

    #[test]
    fn half_open_after_open_timeout() {
        let control = ClockControl::new();
        let breaker = breaker(&control, 1);
        let _ = fail(&breaker);

        control.advance(Duration::from_millis(4_999));
        assert_eq!(breaker.state(), CircuitState::Open);

        control.advance_millis(1);
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.allow_request());
    }

    #[test]
    fn recovers_after_success_threshold() {
        let control = ClockControl::new();
        let breaker = breaker(&control, 1);
        let _ = fail(&breaker);
        control.advance(Duration::from_secs(5));

        assert_eq!(breaker.execute(|| Ok::<_, &str>(())), Ok(()));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert_eq!(breaker.execute(|| Ok::<_, &str>(())), Ok(()));

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.is_healthy());
        assert_eq!(breaker.stats().state_transitions, 3);
    }

    #[test]
    fn probe_failure_reopens() {
        let control = ClockControl::new();
        let breaker = breaker(&control, 1);
        let _ = fail(&breaker);
        control.advance(Duration::from_secs(5));

        assert_eq!(fail(&breaker), Err(Error::Operation("boom")));

        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.is_healthy());
    }

    #[test]
    fn panicking_operation_counts_as_failure() {
        let control = ClockControl::new();
        let breaker = breaker(&control, 1);

        let outcome = catch_unwind(AssertUnwindSafe(|| breaker.execute::<(), String, _>(|| panic!("operation panicked"))));

        assert!(outcome.is_err());
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.stats().failed_requests, 1);
    }

    #[test]
    fn callbacks_fire_on_transitions() {
        let control = ClockControl::new();
        let opened = Arc::new(AtomicU32::new(0));
        let half_opened = Arc::new(AtomicU32::new(0));
        let closed = Arc::new(AtomicU32::new(0));
        let opened_clone = Arc::clone(&opened);
        let half_opened_clone = Arc::clone(&half_opened);
        let closed_clone = Arc::clone(&closed);

        let breaker = CircuitBreaker::builder("callbacks")
            .context(&PolicyContext::new(control.to_clock()))
            .failure_threshold(2)
            .success_threshold(1)
            .on_opened(move |args| {
                assert_eq!(args.from(), CircuitState::Closed);
                assert_eq!(args.consecutive_failures(), 2);
                opened_clone.fetch_add(1, Ordering::SeqCst);
            })
            .on_half_opened(move |args| {
                assert_eq!(args.to(), CircuitState::HalfOpen);
                half_opened_clone.fetch_add(1, Ordering::SeqCst);
            })
            .on_closed(move |_| {
                closed_clone.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        let _ = fail(&breaker);
        let _ = fail(&breaker);
        control.advance(Duration::from_secs(5));
        let _ = breaker.execute(|| Ok::<_, &str>(()));

        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert_eq!(half_opened.load(Ordering::SeqCst), 1);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callback_may_query_the_breaker() {
        let control = ClockControl::new();
        let observed = Arc::new(Mutex::new(None));
        let observed_clone = Arc::clone(&observed);
        let breaker = Arc::new_cyclic(|weak: &std::sync::Weak<CircuitBreaker>| {
            let weak = weak.clone();
            CircuitBreaker::builder("reentrant")
                .context(&PolicyContext::new(control.to_clock()))
                .failure_threshold(1)
                .on_opened(move |_| {
                    if let Some(breaker) = weak.upgrade() {
                        *observed_clone.lock() = Some(breaker.stats().state);
                    }
                })
                .build()
        });

        breaker.record_failure();

        assert_eq!(*observed.lock(), Some(CircuitState::Open));
    }

    #[test]
    fn force_open_and_close() {
        let control = ClockControl::new();
        let breaker = breaker(&control, 5);

        breaker.force_open();
        control.advance(Duration::from_secs(60));
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());

        breaker.force_close();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.allow_request());
    }

    #[test]
    fn reset_clears_everything() {
        let control = ClockControl::new();
        let breaker = breaker(&control, 1);
        let _ = fail(&breaker);
        let _ = fail(&breaker);

        breaker.reset();

        let stats = breaker.stats();
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.rejected_requests, 0);
        assert_eq!(stats.state_transitions, 0);
        assert_eq!(stats.last_failure, None);
    }

    #[test]
    fn config_is_clamped() {
        let breaker = CircuitBreaker::new("clamped", BreakerConfig::default().failure_threshold(0));

        assert_eq!(breaker.name(), "clamped");
        assert_eq!(breaker.config().failure_threshold, 1);
    }

    #[test]
    fn concurrent_probes_never_exceed_limit() {
        let control = ClockControl::new();
        let breaker = CircuitBreaker::builder("probes")
            .context(&PolicyContext::new(control.to_clock()))
            .failure_threshold(1)
            .half_open_max_probes(2)
            .build();
        breaker.record_failure();
        control.advance(Duration::from_secs(5));

        let admitted = AtomicU32::new(0);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    if breaker.allow_request() {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(admitted.load(Ordering::SeqCst), 2);
        assert_eq!(breaker.stats().rejected_requests, 6);
    }

    #[test]
    fn slow_call_completing_in_half_open_keeps_concurrency_limit() {
        let control = ClockControl::new();
        let breaker = CircuitBreaker::builder("slow_call")
            .context(&PolicyContext::new(control.to_clock()))
            .failure_threshold(1)
            .success_threshold(5)
            .half_open_max_probes(1)
            .open_timeout(Duration::from_secs(5))
            .build();

        let result = breaker.execute(|| {
            // While this call runs the circuit opens and becomes half-open.
            breaker.record_failure();
            control.advance(Duration::from_secs(5));
            assert!(breaker.allow_request(), "first probe is admitted");
            Ok::<_, String>(())
        });

        assert_eq!(result, Ok(()));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert_eq!(breaker.stats().consecutive_successes, 0);
        assert!(!breaker.allow_request(), "half-open admitted a second concurrent probe");
    }

    #[test]
    fn transitions_emit_metrics() {
        let control = ClockControl::new();
        let tester = MetricTester::new();
        let context = PolicyContext::new(control.to_clock())
            .name("pipeline")
            .enable_metrics(tester.meter_provider());
        let breaker = CircuitBreaker::builder("metered").context(&context).failure_threshold(1).build();

        breaker.record_failure();
        let _ = breaker.allow_request();

        tester.assert_attributes_contain(&[
            KeyValue::new("resilience.pipeline.name", "pipeline"),
            KeyValue::new("resilience.strategy.name", "metered"),
            KeyValue::new("resilience.event.name", "circuit_opened"),
            KeyValue::new("resilience.event.name", "circuit_rejected"),
            KeyValue::new("circuit_breaker.previous_state", "closed"),
        ]);
    }

    #[test]
    fn transitions_emit_logs() {
        let control = ClockControl::new();
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        let context = PolicyContext::new(control.to_clock()).name("log_pipeline").enable_logs();
        let breaker = CircuitBreaker::builder("log_breaker")
            .context(&context)
            .failure_threshold(1)
            .success_threshold(1)
            .build();

        breaker.record_failure();
        capture.assert_contains("bulwark::breaker");
        capture.assert_contains("log_pipeline");
        capture.assert_contains("log_breaker");
        capture.assert_contains("circuit_breaker.state=\"open\"");

        control.advance(Duration::from_secs(5));
        let _ = breaker.execute(|| Ok::<_, &str>(()));
        capture.assert_contains("circuit_breaker.state=\"half_open\"");
        capture.assert_contains("circuit_breaker.state=\"closed\"");
    }
}
