// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// Arguments passed to the fallback function set by [`with`][super::FallbackBuilder::with].
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub struct FallbackArgs {
    pub(super) elapsed: Duration,
}

impl FallbackArgs {
    /// Returns how long the failed operation ran before returning its error.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}
