// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Display;
use std::time::Instant;

use super::BreakerConfig;

/// The state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitState {
    /// Calls flow normally and failures are counted.
    Closed,

    /// Calls are rejected without running.
    Open,

    /// A limited number of probe calls test whether the dependency recovered.
    HalfOpen,
}

impl CircuitState {
    /// Returns the `snake_case` name used in logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A snapshot of a circuit breaker's state and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct BreakerStats {
    /// The state at the time of the snapshot.
    pub state: CircuitState,
    /// Calls that asked for admission, including rejected ones.
    pub total_requests: u64,
    /// Recorded successes.
    pub successful_requests: u64,
    /// Recorded failures.
    pub failed_requests: u64,
    /// Calls rejected while open, or while half-open with every probe slot taken.
    pub rejected_requests: u64,
    /// Successes since the last failure or the last transition to half-open.
    pub consecutive_successes: u32,
    /// Failures since the last success.
    pub consecutive_failures: u32,
    /// When the breaker last changed state, or when it was created or reset.
    pub last_state_change: Instant,
    /// When the last failure was recorded.
    pub last_failure: Option<Instant>,
    /// Number of state changes since creation or the last reset.
    pub state_transitions: u64,
}

impl BreakerStats {
    fn new(now: Instant) -> Self {
        Self {
            state: CircuitState::Closed,
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            rejected_requests: 0,
            consecutive_successes: 0,
            consecutive_failures: 0,
            last_state_change: now,
            last_failure: None,
            state_transitions: 0,
        }
    }
}

/// A state change, reported to callbacks and telemetry once the lock is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Transition {
    pub(super) from: CircuitState,
    pub(super) to: CircuitState,
    pub(super) consecutive_failures: u32,
}

/// How a call was let through, handed back when its outcome is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Admission {
    /// Admitted while closed.
    Normal,
    /// Admitted as a probe during the half-open period `epoch`.
    Probe { epoch: u64 },
    /// Recorded without knowing how the call was admitted.
    Untracked,
}

/// The breaker's state machine, free of locking and time sources.
///
/// Every method takes the current instant and returns the transition it caused, if any.
#[derive(Debug)]
pub(super) struct BreakerCore {
    config: BreakerConfig,
    stats: BreakerStats,
    probes_in_flight: u32,
    // Bumped on every transition and reset so that probes of an earlier half-open period
    // cannot release slots of the current one.
    epoch: u64,
    // Set by a manual open; suppresses the timed move to half-open.
    isolated: bool,
}

impl BreakerCore {
    pub(super) fn new(config: BreakerConfig, now: Instant) -> Self {
        Self {
            config,
            stats: BreakerStats::new(now),
            probes_in_flight: 0,
            epoch: 0,
            isolated: false,
        }
    }

    pub(super) fn stats(&self) -> BreakerStats {
        self.stats
    }

    /// Moves an open circuit to half-open once the open timeout has elapsed.
    pub(super) fn poll(&mut self, now: Instant) -> Option<Transition> {
        let open_for = now.saturating_duration_since(self.stats.last_state_change);

        (self.stats.state == CircuitState::Open && !self.isolated && open_for >= self.config.open_timeout)
            .then(|| self.transition(CircuitState::HalfOpen, now))
    }

    /// Counts a request and decides whether it may run. `None` means rejected.
    pub(super) fn try_enter(&mut self, now: Instant) -> (Option<Admission>, Option<Transition>) {
        let transition = self.poll(now);
        self.stats.total_requests += 1;

        let admission = match self.stats.state {
            CircuitState::Closed => Some(Admission::Normal),
            CircuitState::HalfOpen if self.probes_in_flight < self.config.half_open_max_probes => {
                self.probes_in_flight += 1;
                Some(Admission::Probe { epoch: self.epoch })
            }
            CircuitState::Open | CircuitState::HalfOpen => None,
        };

        if admission.is_none() {
            self.stats.rejected_requests += 1;
        }

        (admission, transition)
    }

    pub(super) fn on_success(&mut self, now: Instant, admission: Admission) -> Option<Transition> {
        self.stats.successful_requests += 1;
        self.stats.consecutive_failures = 0;

        if self.stats.state != CircuitState::HalfOpen {
            self.stats.consecutive_successes = self.stats.consecutive_successes.saturating_add(1);
            return None;
        }

        // Calls admitted before this half-open period neither hold a probe slot nor vouch
        // for the recovery.
        if !self.release_probe(admission) {
            return None;
        }

        self.stats.consecutive_successes = self.stats.consecutive_successes.saturating_add(1);
        (self.stats.consecutive_successes >= self.config.success_threshold).then(|| self.transition(CircuitState::Closed, now))
    }

    pub(super) fn on_failure(&mut self, now: Instant, admission: Admission) -> Option<Transition> {
        if self.stats.state == CircuitState::HalfOpen {
            self.release_probe(admission);
        }

        self.stats.failed_requests += 1;
        self.stats.consecutive_successes = 0;
        self.stats.consecutive_failures = self.stats.consecutive_failures.saturating_add(1);
        self.stats.last_failure = Some(now);

        match self.stats.state {
            CircuitState::Closed if self.stats.consecutive_failures >= self.config.failure_threshold => {
                Some(self.transition(CircuitState::Open, now))
            }
            CircuitState::HalfOpen => Some(self.transition(CircuitState::Open, now)),
            CircuitState::Closed | CircuitState::Open => None,
        }
    }

    /// Opens the circuit and keeps it open until [`force_close`][Self::force_close] or a reset.
    pub(super) fn force_open(&mut self, now: Instant) -> Option<Transition> {
        self.isolated = true;
        (self.stats.state != CircuitState::Open).then(|| self.transition(CircuitState::Open, now))
    }

    /// Closes the circuit and clears the consecutive counters.
    pub(super) fn force_close(&mut self, now: Instant) -> Option<Transition> {
        self.isolated = false;
        self.stats.consecutive_failures = 0;
        self.stats.consecutive_successes = 0;
        (self.stats.state != CircuitState::Closed).then(|| self.transition(CircuitState::Closed, now))
    }

    pub(super) fn reset(&mut self, now: Instant) {
        self.stats = BreakerStats::new(now);
        self.probes_in_flight = 0;
        self.epoch = self.epoch.wrapping_add(1);
        self.isolated = false;
    }

    /// Frees the probe slot held by `admission`, returning whether it held one.
    fn release_probe(&mut self, admission: Admission) -> bool {
        let holds_slot = match admission {
            Admission::Probe { epoch } => epoch == self.epoch,
            Admission::Untracked => true,
            Admission::Normal => false,
        };

        if holds_slot {
            self.probes_in_flight = self.probes_in_flight.saturating_sub(1);
        }

        holds_slot
    }

    fn transition(&mut self, to: CircuitState, now: Instant) -> Transition {
        let from = self.stats.state;

        self.stats.state = to;
        self.stats.last_state_change = now;
        self.stats.state_transitions += 1;
        self.probes_in_flight = 0;
        self.epoch = self.epoch.wrapping_add(1);

        if to == CircuitState::HalfOpen {
            self.stats.consecutive_successes = 0;
        }

        Transition {
            from,
            to,
            consecutive_failures: self.stats.consecutive_failures,
        }
    }
}
