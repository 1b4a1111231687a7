// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// What a [`Bulkhead`][super::Bulkhead] does with a caller when every slot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(feature = "serde", test), serde(rename_all = "snake_case"))]
#[non_exhaustive]
pub enum RejectionPolicy {
    /// Reject immediately without blocking.
    #[default]
    FailFast,

    /// Queue the caller, up to `max_waiting` callers, until a slot frees up or the maximum
    /// wait elapses. A caller arriving at a full queue is rejected.
    Wait,

    /// Like [`Wait`][Self::Wait], except that a caller arriving at a full queue evicts the
    /// caller that has been queued the longest and takes its place.
    DiscardOldest,
}

impl RejectionPolicy {
    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(dead_code, reason = "only used for logging")
    )]
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::FailFast => "fail_fast",
            Self::Wait => "wait",
            Self::DiscardOldest => "discard_oldest",
        }
    }
}

/// Configuration of a [`Bulkhead`][super::Bulkhead].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(feature = "serde", test), serde(default))]
#[non_exhaustive]
pub struct BulkheadConfig {
    /// Calls allowed to run at once. Clamped to at least 1.
    pub max_concurrent: usize,

    /// Callers allowed to queue for a slot. Only used by the queuing policies.
    pub max_waiting: usize,

    /// Longest time a queued caller waits. Zero waits without bound.
    #[cfg_attr(any(feature = "serde", test), serde(with = "crate::serde_duration"))]
    pub max_wait_duration: Duration,

    /// What happens to a caller when every slot is taken.
    pub rejection_policy: RejectionPolicy,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            max_waiting: 0,
            max_wait_duration: Duration::ZERO,
            rejection_policy: RejectionPolicy::FailFast,
        }
    }
}

impl BulkheadConfig {
    /// Sets the number of calls allowed to run at once.
    #[must_use]
    pub fn max_concurrent(self, max_concurrent: usize) -> Self {
        Self { max_concurrent, ..self }
    }

    /// Sets the number of callers allowed to queue.
    #[must_use]
    pub fn max_waiting(self, max_waiting: usize) -> Self {
        Self { max_waiting, ..self }
    }

    /// Sets the longest time a queued caller waits.
    #[must_use]
    pub fn max_wait_duration(self, max_wait_duration: Duration) -> Self {
        Self {
            max_wait_duration,
            ..self
        }
    }

    /// Sets what happens to a caller when every slot is taken.
    #[must_use]
    pub fn rejection_policy(self, rejection_policy: RejectionPolicy) -> Self {
        Self { rejection_policy, ..self }
    }

    pub(super) fn normalized(self) -> Self {
        Self {
            max_concurrent: self.max_concurrent.max(1),
            ..self
        }
    }
}
