use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use crate::request::Request;

/// Per-host FIFO of pending requests plus politeness state
///
/// A bucket remembers when its host may next be dispatched to and the
/// minimum gap between dispatches. Buckets are owned by the
/// [`Frontier`](crate::frontier::Frontier) and only touched under its lock
/// (or by the worker that has exclusively removed the bucket from the
/// ordered index), so they carry no synchronization of their own.
#[derive(Debug)]
pub(crate) struct HostBucket {
    /// Stable creation order, used to break ties between equally-eligible hosts
    seq: u64,

    /// Pending requests in admission order
    pending: VecDeque<Request>,

    /// Earliest instant the next dispatch for this host may happen
    next_eligible: Instant,

    /// Minimum gap between dispatches for this host
    delay: Duration,
}

impl HostBucket {
    /// Creates a bucket that is immediately eligible
    pub(crate) fn new(seq: u64, delay: Duration, now: Instant) -> Self {
        Self {
            seq,
            pending: VecDeque::new(),
            next_eligible: now,
            delay,
        }
    }

    /// Appends a request to the pending queue
    pub(crate) fn push(&mut self, req: Request) {
        self.pending.push_back(req);
    }

    /// Removes and returns the head request, advancing `next_eligible`
    ///
    /// Callers guarantee the bucket is non-empty and `now` has reached
    /// `next_eligible`; the frontier's pop path checks both under its lock.
    pub(crate) fn pop_ready(&mut self, now: Instant) -> Request {
        debug_assert!(!self.pending.is_empty());
        debug_assert!(now >= self.next_eligible);

        self.next_eligible = now + self.delay;
        self.pending.pop_front().expect("pop_ready on empty bucket")
    }

    /// Overrides the per-host delay
    ///
    /// A `next_eligible` that already lies in the past is clamped up to
    /// `now`; one in the future is left alone so a delay change never
    /// retroactively penalizes the host.
    pub(crate) fn set_delay(&mut self, delay: Duration, now: Instant) {
        self.delay = delay;
        if self.next_eligible < now {
            self.next_eligible = now;
        }
    }

    /// Accounts a dispatch that bypassed the pending queue (robots.txt)
    pub(crate) fn record_dispatch(&mut self, now: Instant) {
        self.next_eligible = now + self.delay;
    }

    /// Key under which a non-empty bucket is held in the ordered index
    pub(crate) fn index_key(&self) -> (Instant, u64) {
        (self.next_eligible, self.seq)
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
