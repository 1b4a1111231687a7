// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use super::state::{SlotState, Ticket};
use super::{BulkheadBuilder, BulkheadConfig, BulkheadPermit, BulkheadStats, RejectionPolicy};
use crate::utils::TelemetryHelper;
use crate::{Error, PolicyContext, PolicyError};

/// Limits how many calls run against a dependency at once.
///
/// See the [module documentation][super] for the admission rules.
#[derive(Debug)]
pub struct Bulkhead {
    name: Cow<'static, str>,
    config: BulkheadConfig,
    state: Mutex<SlotState>,
    slot_freed: Condvar,
    telemetry: TelemetryHelper,
}

impl Bulkhead {
    /// Creates a bulkhead with a default [`PolicyContext`].
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, config: BulkheadConfig) -> Self {
        Self::builder(name).config(config).build()
    }

    /// Starts building a bulkhead. Prefer `snake_case` names.
    #[must_use]
    pub fn builder(name: impl Into<Cow<'static, str>>) -> BulkheadBuilder {
        BulkheadBuilder::new(name.into())
    }

    pub(super) fn from_parts(name: Cow<'static, str>, config: BulkheadConfig, context: &PolicyContext) -> Self {
        Self {
            telemetry: context.create_telemetry(name.clone()),
            state: Mutex::new(SlotState::default()),
            slot_freed: Condvar::new(),
            config: config.normalized(),
            name,
        }
    }

    /// Takes a slot if one is free. Never waits, whatever the rejection policy.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        state.count_request();

        if state.try_grant(self.config.max_concurrent) {
            return true;
        }

        state.count_rejection();
        drop(state);

        self.emit_rejected();
        false
    }

    /// Takes a slot, waiting for one according to the rejection policy.
    ///
    /// A successful call must be paired with [`release`][Self::release]. Prefer
    /// [`acquire_permit`][Self::acquire_permit] or [`execute`][Self::execute], which release
    /// the slot automatically.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::BulkheadFull`] when the caller is rejected or evicted from the
    /// queue, and [`PolicyError::WaitTimeout`] when the maximum wait elapses first.
    pub fn acquire(&self) -> Result<(), PolicyError> {
        let mut state = self.state.lock();
        state.count_request();

        if state.try_grant(self.config.max_concurrent) {
            return Ok(());
        }

        let evict_oldest = match self.config.rejection_policy {
            RejectionPolicy::FailFast => return Err(self.reject(state)),
            RejectionPolicy::Wait => false,
            RejectionPolicy::DiscardOldest => true,
        };

        let Some((ticket, evicted)) = state.enqueue(self.config.max_waiting, evict_oldest) else {
            return Err(self.reject(state));
        };

        if evicted.is_some() {
            // Wake the evicted waiter so it can leave.
            self.slot_freed.notify_all();
            self.emit_rejected();
        }

        self.wait_for_slot(state, ticket)
    }

    /// Like [`acquire`][Self::acquire], but returns a permit that releases the slot when
    /// dropped.
    ///
    /// # Errors
    ///
    /// Same as [`acquire`][Self::acquire].
    pub fn acquire_permit(&self) -> Result<BulkheadPermit<'_>, PolicyError> {
        self.acquire()?;
        Ok(BulkheadPermit { bulkhead: self })
    }

    /// Releases a slot taken by [`try_acquire`][Self::try_acquire] or
    /// [`acquire`][Self::acquire] and wakes one waiter.
    ///
    /// Releasing more slots than were taken has no effect.
    pub fn release(&self) {
        self.state.lock().release();
        self.slot_freed.notify_one();
    }

    /// Runs `operation` in a slot. The slot is released when the operation returns or panics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Policy`] when no slot could be acquired, in which case the operation
    /// does not run, or [`Error::Operation`] when the operation fails.
    pub fn execute<T, E, F>(&self, operation: F) -> Result<T, Error<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let _permit = self.acquire_permit()?;
        operation().map_err(Error::Operation)
    }

    /// Returns `true` when every slot is taken.
    #[must_use]
    pub fn is_full(&self) -> bool {
        !self.state.lock().has_free_slot(self.config.max_concurrent)
    }

    /// Returns the fraction of slots in use, from `0.0` to `1.0`.
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "slot counts are far below 2^52")]
    pub fn utilization(&self) -> f64 {
        self.state.lock().current_concurrent() as f64 / self.config.max_concurrent as f64
    }

    /// Returns a snapshot of occupancy and counters.
    #[must_use]
    pub fn stats(&self) -> BulkheadStats {
        self.state.lock().stats()
    }

    /// Clears the counters. Slots in use and queued callers are unaffected.
    pub fn reset(&self) {
        self.state.lock().reset();
    }

    /// Returns the name of this bulkhead.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration, after clamping.
    #[must_use]
    pub fn config(&self) -> &BulkheadConfig {
        &self.config
    }

    #[cfg_attr(test, mutants::skip)] // causes test timeouts
    fn wait_for_slot(&self, mut state: MutexGuard<'_, SlotState>, ticket: Ticket) -> Result<(), PolicyError> {
        let started = Instant::now();
        let deadline = if self.config.max_wait_duration.is_zero() {
            None
        } else {
            started.checked_add(self.config.max_wait_duration)
        };

        loop {
            if state.take_eviction(ticket) {
                self.pass_wakeup(&state);
                return Err(PolicyError::BulkheadFull { name: self.name.clone() });
            }

            if state.try_grant(self.config.max_concurrent) {
                state.leave_queue(ticket);
                return Ok(());
            }

            match deadline {
                None => self.slot_freed.wait(&mut state),
                Some(deadline) if Instant::now() >= deadline => {
                    state.leave_queue(ticket);
                    state.count_rejection();
                    self.pass_wakeup(&state);
                    drop(state);

                    let waited = started.elapsed();
                    self.emit_wait_timeout(waited);
                    return Err(PolicyError::WaitTimeout {
                        name: self.name.clone(),
                        waited,
                    });
                }
                Some(deadline) => {
                    let _ = self.slot_freed.wait_until(&mut state, deadline);
                }
            }
        }
    }

    // A leaving waiter may have consumed the wakeup meant for a slot that is still free.
    fn pass_wakeup(&self, state: &SlotState) {
        if state.has_waiters() && state.has_free_slot(self.config.max_concurrent) {
            self.slot_freed.notify_one();
        }
    }

    fn reject(&self, mut state: MutexGuard<'_, SlotState>) -> PolicyError {
        state.count_rejection();
        drop(state);

        self.emit_rejected();
        PolicyError::BulkheadFull { name: self.name.clone() }
    }

    #[cfg_attr(
        not(any(feature = "logs", feature = "metrics", test)),
        expect(clippy::unused_self, reason = "unused when neither logs nor metrics are enabled")
    )]
    fn emit_rejected(&self) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled {
            tracing::event!(
                name: "bulwark.bulkhead",
                tracing::Level::WARN,
                resilience.pipeline.name = %self.telemetry.pipeline_name,
                resilience.strategy.name = %self.telemetry.strategy_name,
                resilience.event.name = crate::telemetry::BULKHEAD_REJECTED,
                bulkhead.max_concurrent = self.config.max_concurrent,
                bulkhead.rejection_policy = self.config.rejection_policy.as_str(),
            );
        }

        #[cfg(any(feature = "metrics", test))]
        if self.telemetry.metrics_enabled() {
            self.telemetry.report_event(crate::telemetry::BULKHEAD_REJECTED, &[]);
        }
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, reason = "wait time is only logged")
    )]
    #[cfg_attr(
        not(any(feature = "logs", feature = "metrics", test)),
        expect(clippy::unused_self, reason = "unused when neither logs nor metrics are enabled")
    )]
    fn emit_wait_timeout(&self, waited: Duration) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled {
            tracing::event!(
                name: "bulwark.bulkhead",
                tracing::Level::WARN,
                resilience.pipeline.name = %self.telemetry.pipeline_name,
                resilience.strategy.name = %self.telemetry.strategy_name,
                resilience.event.name = crate::telemetry::BULKHEAD_WAIT_TIMEOUT,
                bulkhead.waited = waited.as_secs_f32(),
            );
        }

        #[cfg(any(feature = "metrics", test))]
        if self.telemetry.metrics_enabled() {
            self.telemetry.report_event(crate::telemetry::BULKHEAD_WAIT_TIMEOUT, &[]);
        }
    }
}
