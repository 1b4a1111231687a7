// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::VecDeque;

/// A snapshot of a bulkhead's occupancy and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub struct BulkheadStats {
    /// Calls currently holding a slot.
    pub current_concurrent: usize,
    /// Callers currently queued for a slot.
    pub current_waiting: usize,
    /// Calls that asked for a slot.
    pub total_requests: u64,
    /// Calls that never got a slot: rejected, evicted from the queue, or timed out waiting.
    pub rejected_requests: u64,
    /// Highest number of slots held at once.
    pub max_concurrent_reached: usize,
}

/// Queue position of a waiting caller.
pub(super) type Ticket = u64;

/// Occupancy bookkeeping, always accessed under the bulkhead's lock.
#[derive(Debug, Default)]
pub(super) struct SlotState {
    current_concurrent: usize,
    // Oldest waiter at the front.
    queue: VecDeque<Ticket>,
    // Waiters removed from the queue that have not noticed yet.
    evicted: Vec<Ticket>,
    next_ticket: Ticket,
    total_requests: u64,
    rejected_requests: u64,
    max_concurrent_reached: usize,
}

impl SlotState {
    pub(super) fn count_request(&mut self) {
        self.total_requests += 1;
    }

    pub(super) fn count_rejection(&mut self) {
        self.rejected_requests += 1;
    }

    pub(super) fn has_free_slot(&self, max_concurrent: usize) -> bool {
        self.current_concurrent < max_concurrent
    }

    /// Takes a slot if one is free.
    pub(super) fn try_grant(&mut self, max_concurrent: usize) -> bool {
        if !self.has_free_slot(max_concurrent) {
            return false;
        }

        self.current_concurrent += 1;
        self.max_concurrent_reached = self.max_concurrent_reached.max(self.current_concurrent);
        true
    }

    pub(super) fn release(&mut self) {
        self.current_concurrent = self.current_concurrent.saturating_sub(1);
    }

    /// Queues a caller. When the queue is full the caller is refused, or, if `evict_oldest`
    /// is set, the oldest waiter is evicted to make room and its ticket is returned.
    pub(super) fn enqueue(&mut self, max_waiting: usize, evict_oldest: bool) -> Option<(Ticket, Option<Ticket>)> {
        let mut evicted = None;

        if self.queue.len() >= max_waiting {
            if !evict_oldest {
                return None;
            }

            let oldest = self.queue.pop_front()?;
            self.evicted.push(oldest);
            self.rejected_requests += 1;
            evicted = Some(oldest);
        }

        let ticket = self.next_ticket;
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.queue.push_back(ticket);

        Some((ticket, evicted))
    }

    /// Returns `true`, once, if the ticket was evicted.
    pub(super) fn take_eviction(&mut self, ticket: Ticket) -> bool {
        match self.evicted.iter().position(|&evicted| evicted == ticket) {
            Some(index) => {
                self.evicted.swap_remove(index);
                true
            }
            None => false,
        }
    }

    pub(super) fn leave_queue(&mut self, ticket: Ticket) {
        self.queue.retain(|&queued| queued != ticket);
    }

    pub(super) fn has_waiters(&self) -> bool {
        !self.queue.is_empty()
    }

    pub(super) fn current_concurrent(&self) -> usize {
        self.current_concurrent
    }

    pub(super) fn stats(&self) -> BulkheadStats {
        BulkheadStats {
            current_concurrent: self.current_concurrent,
            current_waiting: self.queue.len(),
            total_requests: self.total_requests,
            rejected_requests: self.rejected_requests,
            max_concurrent_reached: self.max_concurrent_reached,
        }
    }

    /// Clears the counters. Slots in use and queued callers are live and stay untouched.
    pub(super) fn reset(&mut self) {
        self.total_requests = 0;
        self.rejected_requests = 0;
        self.max_concurrent_reached = self.current_concurrent;
    }
}
