// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Telemetry state captured by a policy when it is built.
///
/// The pipeline and strategy names are attached to every emitted log event and metric.
#[derive(Debug, Clone)]
pub(crate) struct TelemetryHelper {
    #[cfg(any(feature = "metrics", feature = "logs", test))]
    pub(crate) pipeline_name: std::borrow::Cow<'static, str>,
    #[cfg(any(feature = "metrics", feature = "logs", test))]
    pub(crate) strategy_name: std::borrow::Cow<'static, str>,
    #[cfg(any(feature = "metrics", test))]
    pub(crate) event_reporter: Option<opentelemetry::metrics::Counter<u64>>,
    pub(crate) logs_enabled: bool,
}

impl TelemetryHelper {
    #[cfg(any(feature = "metrics", test))]
    pub(crate) fn metrics_enabled(&self) -> bool {
        self.event_reporter.is_some()
    }

    /// Reports a single `resilience.event` occurrence with the standard attributes followed
    /// by any event-specific ones.
    #[cfg(any(feature = "metrics", test))]
    pub(crate) fn report_event(&self, event_name: &'static str, extra: &[opentelemetry::KeyValue]) {
        use crate::telemetry::{EVENT_NAME, PIPELINE_NAME, STRATEGY_NAME};

        if let Some(reporter) = &self.event_reporter {
            let mut attributes = Vec::with_capacity(3 + extra.len());
            attributes.push(opentelemetry::KeyValue::new(PIPELINE_NAME, self.pipeline_name.clone()));
            attributes.push(opentelemetry::KeyValue::new(STRATEGY_NAME, self.strategy_name.clone()));
            attributes.push(opentelemetry::KeyValue::new(EVENT_NAME, event_name));
            attributes.extend_from_slice(extra);

            reporter.add(1, &attributes);
        }
    }
}
