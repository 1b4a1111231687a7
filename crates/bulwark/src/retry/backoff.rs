// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use super::RetryConfig;
use crate::rnd::Rnd;

/// Width of the jitter range, relative to the nominal delay.
const JITTER_FACTOR: f64 = 0.5;

/// Exponential backoff schedule: the delay before retry `k` (0-based) is
/// `min(initial_delay * backoff_multiplier^k, max_delay)`.
#[derive(Debug, Clone)]
pub(super) struct Backoff {
    initial_delay: Duration,
    multiplier: f64,
    max_delay: Duration,
    use_jitter: bool,
    rnd: Rnd,
}

impl Backoff {
    pub(super) fn new(config: &RetryConfig, rnd: Rnd) -> Self {
        Self {
            initial_delay: config.initial_delay,
            // NaN and negative factors collapse to zero.
            multiplier: config.backoff_multiplier.max(0.0),
            max_delay: config.max_delay,
            use_jitter: config.use_jitter,
            rnd,
        }
    }

    /// Returns the endless sequence of delays; callers take as many as they retry.
    pub(super) fn delays(&self) -> Delays {
        Delays {
            backoff: self.clone(),
            retry: 0,
        }
    }

    fn delay(&self, retry: u32) -> Duration {
        let factor = self.multiplier.powi(i32::try_from(retry).unwrap_or(i32::MAX));
        let nominal = secs_to_duration_saturating(self.initial_delay.as_secs_f64() * factor).min(self.max_delay);

        if self.use_jitter {
            apply_jitter(nominal, &self.rnd).min(self.max_delay)
        } else {
            nominal
        }
    }
}

/// Iterator over the delays of a [`Backoff`].
#[derive(Debug)]
pub(super) struct Delays {
    backoff: Backoff,
    retry: u32,
}

impl Iterator for Delays {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        let delay = self.backoff.delay(self.retry);
        self.retry = self.retry.saturating_add(1);
        Some(delay)
    }
}

/// Adds a symmetric, uniform jitter around `delay`: the result lies in
/// `[0.75 * delay, 1.25 * delay]`.
fn apply_jitter(delay: Duration, rnd: &Rnd) -> Duration {
    let secs = delay.as_secs_f64();
    let offset = (secs * JITTER_FACTOR) / 2.0;
    let random = (secs * JITTER_FACTOR).mul_add(rnd.next_f64(), -offset);

    secs_to_duration_saturating(secs + random)
}

fn secs_to_duration_saturating(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }

    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn backoff(initial_ms: u64, multiplier: f64, max_ms: u64) -> Backoff {
        let config = RetryConfig::default()
            .initial_delay(Duration::from_millis(initial_ms))
            .backoff_multiplier(multiplier)
            .max_delay(Duration::from_millis(max_ms));

        Backoff::new(&config, Rnd::default())
    }

    fn millis(backoff: &Backoff, count: usize) -> Vec<u128> {
        backoff.delays().take(count).map(|delay| delay.as_millis()).collect()
    }

    #[rstest]
    #[case::doubling(100, 2.0, 30_000, vec![100, 200, 400, 800])]
    #[case::capped(100, 2.0, 300, vec![100, 200, 300, 300])]
    #[case::constant(50, 1.0, 30_000, vec![50, 50, 50, 50])]
    #[case::tripling(10, 3.0, 30_000, vec![10, 30, 90, 270])]
    #[case::zero_multiplier(100, 0.0, 30_000, vec![100, 0, 0, 0])]
    #[case::negative_multiplier(100, -2.0, 30_000, vec![100, 0, 0, 0])]
    #[case::zero_initial(0, 2.0, 30_000, vec![0, 0, 0, 0])]
    fn schedule(#[case] initial_ms: u64, #[case] multiplier: f64, #[case] max_ms: u64, #[case] expected: Vec<u128>) {
        assert_eq!(millis(&backoff(initial_ms, multiplier, max_ms), 4), expected);
    }

    #[test]
    fn huge_exponents_saturate_at_max_delay() {
        let backoff = backoff(1_000, 10.0, 60_000);

        assert_eq!(backoff.delays().nth(500), Some(Duration::from_secs(60)));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn nan_multiplier_counts_as_zero() {
        assert_eq!(millis(&backoff(100, f64::NAN, 30_000), 2), vec![100, 0]);
    }

    #[rstest]
    #[case::lowest(0.0, 75.0)]
    #[case::middle(0.5, 100.0)]
    #[case::highest(1.0, 125.0)]
    fn jitter_range(#[case] random: f64, #[case] expected_ms: f64) {
        let config = RetryConfig::default()
            .initial_delay(Duration::from_millis(100))
            .use_jitter(true);
        let backoff = Backoff::new(&config, Rnd::new_fixed(random));

        let delay_ms = backoff.delays().next().unwrap().as_secs_f64() * 1_000.0;

        assert!((delay_ms - expected_ms).abs() < 0.001, "expected {expected_ms}ms, got {delay_ms}ms");
    }

    #[test]
    fn jitter_respects_max_delay() {
        let config = RetryConfig::default()
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(100))
            .use_jitter(true);
        let backoff = Backoff::new(&config, Rnd::new_fixed(1.0));

        assert_eq!(backoff.delays().next(), Some(Duration::from_millis(100)));
    }
}
