// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::CircuitState;

/// Arguments passed to the [`on_opened`][super::CircuitBreakerBuilder::on_opened],
/// [`on_closed`][super::CircuitBreakerBuilder::on_closed] and
/// [`on_half_opened`][super::CircuitBreakerBuilder::on_half_opened] callbacks.
#[derive(Debug, Clone, Copy)]
pub struct TransitionArgs {
    pub(super) from: CircuitState,
    pub(super) to: CircuitState,
    pub(super) consecutive_failures: u32,
}

impl TransitionArgs {
    /// Returns the state the breaker left.
    #[must_use]
    pub fn from(&self) -> CircuitState {
        self.from
    }

    /// Returns the state the breaker entered.
    #[must_use]
    pub fn to(&self) -> CircuitState {
        self.to
    }

    /// Returns the failure streak at the time of the transition.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_args() {
        let args = TransitionArgs {
            from: CircuitState::Closed,
            to: CircuitState::Open,
            consecutive_failures: 4,
        };

        assert_eq!(args.from(), CircuitState::Closed);
        assert_eq!(args.to(), CircuitState::Open);
        assert_eq!(args.consecutive_failures(), 4);
    }
}
