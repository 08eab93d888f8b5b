//! Bookkeeping for notifications awaiting their ack
//!
//! The stack acks notifications in the order they were handed over and the
//! ack does not name the characteristic, so in-flight entries are matched
//! FIFO. At most one notification per characteristic is in flight; later
//! values for that characteristic wait in `pending`.

use crate::uuid::Uuid;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub(crate) struct NotificationQueue {
    in_flight: VecDeque<Uuid>,
    pending: VecDeque<(Uuid, Vec<u8>)>,
}

impl NotificationQueue {
    pub(crate) fn is_in_flight(&self, characteristic: &Uuid) -> bool {
        self.in_flight.contains(characteristic)
    }

    pub(crate) fn mark_dispatched(&mut self, characteristic: Uuid) {
        self.in_flight.push_back(characteristic);
    }

    /// Queues a value behind the in-flight one. Returns `false` when the
    /// queue already holds `limit` entries.
    pub(crate) fn enqueue(&mut self, characteristic: Uuid, value: Vec<u8>, limit: usize) -> bool {
        if self.pending.len() >= limit {
            return false;
        }
        self.pending.push_back((characteristic, value));
        true
    }

    /// Completes the oldest in-flight notification.
    pub(crate) fn complete_oldest(&mut self) -> Option<Uuid> {
        self.in_flight.pop_front()
    }

    /// Takes the earliest queued value for `characteristic`.
    pub(crate) fn take_pending(&mut self, characteristic: &Uuid) -> Option<Vec<u8>> {
        let index = self
            .pending
            .iter()
            .position(|(uuid, _)| uuid == characteristic)?;
        self.pending.remove(index).map(|(_, value)| value)
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub(crate) fn clear(&mut self) {
        self.in_flight.clear();
        self.pending.clear();
    }
}
