// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::Bulkhead;

/// A bulkhead slot that is released when dropped.
///
/// Returned by [`Bulkhead::acquire_permit`]. The slot is released on every exit path,
/// including an unwinding panic.
#[derive(Debug)]
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct BulkheadPermit<'a> {
    pub(super) bulkhead: &'a Bulkhead,
}

impl BulkheadPermit<'_> {
    /// Returns the bulkhead this permit belongs to.
    #[must_use]
    pub fn bulkhead(&self) -> &Bulkhead {
        self.bulkhead
    }
}

impl Drop for BulkheadPermit<'_> {
    fn drop(&mut self) {
        self.bulkhead.release();
    }
}
