// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Display;

/// A single attempt of a retried operation.
///
/// Indices are 0-based: index 0 is the initial call and index `n` is the `n`-th retry.
///
/// # Examples
///
/// ```
/// use bulwark::retry::Attempt;
///
/// let attempt = Attempt::new(0, false);
/// assert!(attempt.is_first());
/// assert!(!attempt.is_last());
/// assert_eq!(attempt.to_string(), "0");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attempt {
    index: u32,
    is_last: bool,
}

impl Attempt {
    /// Creates an attempt with the given index.
    #[must_use]
    pub fn new(index: u32, is_last: bool) -> Self {
        Self { index, is_last }
    }

    pub(super) fn first(max_retries: u32) -> Self {
        Self::new(0, max_retries == 0)
    }

    #[cfg_attr(test, mutants::skip)] // causes test timeouts
    pub(super) fn next(self, max_retries: u32) -> Self {
        let index = self.index.saturating_add(1);
        Self::new(index, index >= max_retries)
    }

    /// Returns the 0-based index of this attempt.
    #[must_use]
    pub fn index(self) -> u32 {
        self.index
    }

    /// Returns `true` for the initial call.
    #[must_use]
    pub fn is_first(self) -> bool {
        self.index == 0
    }

    /// Returns `true` when no retry follows this attempt.
    #[must_use]
    pub fn is_last(self) -> bool {
        self.is_last
    }
}

impl Display for Attempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.index.fmt(f)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_ends_after_max_retries() {
        let first = Attempt::first(2);
        let second = first.next(2);
        let third = second.next(2);

        assert_eq!(first, Attempt::new(0, false));
        assert_eq!(second, Attempt::new(1, false));
        assert_eq!(third, Attempt::new(2, true));
        assert!(!third.is_first());
    }

    #[test]
    fn no_retries_means_first_is_last() {
        let attempt = Attempt::first(0);

        assert!(attempt.is_first());
        assert!(attempt.is_last());
    }

    #[test]
    fn next_saturates() {
        let attempt = Attempt::new(u32::MAX, true).next(u32::MAX);

        assert_eq!(attempt.index(), u32::MAX);
        assert!(attempt.is_last());
    }
}
