// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;

use crate::Clock;

pub(crate) const DEFAULT_PIPELINE_NAME: &str = "default";

/// Shared dependencies and telemetry configuration for a group of policies.
///
/// Pass a single `PolicyContext` to every policy guarding the same dependency to share a
/// [`Clock`] and a pipeline name. The pipeline name is attached to every log event and
/// metric emitted by those policies.
///
/// # Examples
///
/// ```
/// use bulwark::breaker::CircuitBreaker;
/// use bulwark::{Clock, PolicyContext};
///
/// let context = PolicyContext::new(Clock::new_system()).name("billing");
/// let breaker = CircuitBreaker::builder("billing_breaker").context(&context).build();
///
/// assert_eq!(breaker.name(), "billing_breaker");
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct PolicyContext {
    clock: Clock,
    name: Cow<'static, str>,
    #[cfg(any(feature = "metrics", test))]
    meter: Option<opentelemetry::metrics::Meter>,
    logs_enabled: bool,
}

impl Default for PolicyContext {
    fn default() -> Self {
        Self::new(Clock::new_system())
    }
}

impl PolicyContext {
    /// Creates a context with a clock. Initializes with `name = "default"`.
    pub fn new(clock: impl AsRef<Clock>) -> Self {
        Self {
            clock: clock.as_ref().clone(),
            name: Cow::Borrowed(DEFAULT_PIPELINE_NAME),
            #[cfg(any(feature = "metrics", test))]
            meter: None,
            logs_enabled: false,
        }
    }

    /// Sets the pipeline name for telemetry correlation. Prefer `snake_case`.
    #[must_use]
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Enables metrics reporting with the given OpenTelemetry meter provider.
    #[must_use]
    #[cfg(any(feature = "metrics", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
    pub fn enable_metrics(self, provider: &dyn opentelemetry::metrics::MeterProvider) -> Self {
        Self {
            meter: Some(crate::metrics::create_meter(provider)),
            ..self
        }
    }

    /// Enables structured logging for resilience events.
    #[must_use]
    #[cfg(any(feature = "logs", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "logs")))]
    pub fn enable_logs(self) -> Self {
        Self {
            logs_enabled: true,
            ..self
        }
    }

    /// Returns the clock shared by the policies built from this context.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    #[cfg_attr(
        not(any(feature = "metrics", feature = "logs", test)),
        expect(unused_variables, reason = "unused when neither logs nor metrics are enabled")
    )]
    pub(crate) fn create_telemetry(&self, strategy_name: Cow<'static, str>) -> crate::utils::TelemetryHelper {
        crate::utils::TelemetryHelper {
            #[cfg(any(feature = "metrics", test))]
            event_reporter: self.meter.as_ref().map(crate::metrics::create_resilience_event_counter),
            #[cfg(any(feature = "metrics", feature = "logs", test))]
            pipeline_name: self.name.clone(),
            #[cfg(any(feature = "metrics", feature = "logs", test))]
            strategy_name,
            logs_enabled: self.logs_enabled,
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClockControl;
    use crate::testing::MetricTester;

    #[test]
    fn new_sets_default_pipeline_name() {
        let context = PolicyContext::new(ClockControl::new().to_clock());
        let telemetry = context.create_telemetry("test".into());

        assert_eq!(telemetry.pipeline_name.as_ref(), DEFAULT_PIPELINE_NAME);
        assert_eq!(telemetry.strategy_name.as_ref(), "test");
        assert!(!telemetry.logs_enabled);
        assert!(telemetry.event_reporter.is_none());
    }

    #[test]
    fn name_with_owned_value() {
        let context = PolicyContext::default().name(String::from("custom_pipeline"));
        let telemetry = context.create_telemetry("test".into());

        assert_eq!(telemetry.pipeline_name.as_ref(), "custom_pipeline");
        assert!(matches!(telemetry.pipeline_name, Cow::Owned(_)));
    }

    #[test]
    fn enable_logs_propagates_to_telemetry() {
        let context = PolicyContext::default().enable_logs();

        assert!(context.create_telemetry("test".into()).logs_enabled);
    }

    #[test]
    fn enable_metrics_creates_reporter_per_policy() {
        let tester = MetricTester::new();
        let context = PolicyContext::default().enable_metrics(tester.meter_provider());

        let first = context.create_telemetry("first".into());
        let second = context.create_telemetry("second".into());

        assert!(first.metrics_enabled());
        assert!(second.metrics_enabled());
    }

    #[test]
    fn clock_is_shared() {
        let control = ClockControl::new();
        let context = PolicyContext::new(control.to_clock());
        let start = context.clock().instant();

        control.advance_millis(10);

        assert_eq!(context.clock().instant() - start, std::time::Duration::from_millis(10));
    }

    #[test]
    fn assert_types() {
        static_assertions::assert_impl_all!(PolicyContext: Send, Sync, Clone, std::fmt::Debug);
    }
}
