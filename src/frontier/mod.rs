//! Scheduling frontier
//!
//! The frontier is the shared data structure a crawl runs on. It admits
//! each canonical URL once, partitions pending requests into per-host FIFO
//! buckets, and hands workers the globally next-eligible request while
//! enforcing every host's minimum gap between dispatches.
//!
//! All bookkeeping (ordered bucket index, seen-set, in-flight counter,
//! lifecycle phase) lives behind one coarse mutex that is held briefly and
//! never across an await. Waiting for a host to become eligible, or for new
//! work to be admitted, happens outside that lock on a [`Notify`] paired
//! with a deadline sleep.

mod bucket;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{sleep_until, Instant};

use crate::frontier::bucket::HostBucket;
use crate::request::Request;
use crate::ErrorKind;

/// Result of offering a request to the frontier
#[derive(Debug)]
pub enum AdmitOutcome {
    /// The request was enqueued; its URL is now in the seen-set
    Admitted,

    /// The URL was admitted earlier; the request was dropped
    Duplicate,

    /// The request cannot be enqueued; ownership returns to the caller
    Rejected {
        request: Box<Request>,
        reason: ErrorKind,
    },
}

/// Frontier lifecycle
///
/// `Open` is the seeding window: with nothing admitted yet, takers block
/// rather than conclude the crawl is over. `Draining` is the working state;
/// it ends when the index is empty with nothing in flight. `Closed` stops
/// both takers and admissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Open,
    Draining,
    Closed,
}

struct FrontierState {
    phase: Phase,
    /// Every bucket ever created, kept for politeness state across refills
    buckets: HashMap<String, HostBucket>,
    /// Non-empty buckets ordered by (next_eligible, creation seq)
    index: BTreeMap<(Instant, u64), String>,
    /// Canonical URL strings ever admitted
    seen: HashSet<String>,
    /// Requests popped but not yet completed
    in_flight: usize,
    next_seq: u64,
}

/// Concurrent crawl frontier
///
/// Invariant: a bucket appears in the ordered index exactly when its
/// pending queue is non-empty, keyed by its current eligibility instant.
pub struct Frontier {
    state: Mutex<FrontierState>,
    notify: Notify,
    default_delay: Duration,
}

impl Frontier {
    /// Creates an open frontier with the given default per-host delay
    pub fn new(default_delay: Duration) -> Self {
        Self {
            state: Mutex::new(FrontierState {
                phase: Phase::Open,
                buckets: HashMap::new(),
                index: BTreeMap::new(),
                seen: HashSet::new(),
                in_flight: 0,
                next_seq: 0,
            }),
            notify: Notify::new(),
            default_delay,
        }
    }

    /// Offers a request for admission
    ///
    /// Admission deduplicates on the canonical URL string, routes the
    /// request to its host bucket (creating or re-indexing the bucket as
    /// needed), and wakes any waiting worker. A URL is inserted into the
    /// seen-set at most once for the lifetime of the frontier, so the same
    /// page can never be dispatched twice.
    pub fn admit(&self, req: Request) -> AdmitOutcome {
        let mut state = self.state.lock().expect("frontier lock poisoned");

        if state.phase == Phase::Closed {
            return AdmitOutcome::Rejected {
                request: Box::new(req),
                reason: ErrorKind::ShuttingDown,
            };
        }

        let scheme = req.url().scheme();
        if scheme != "http" && scheme != "https" {
            return AdmitOutcome::Rejected {
                reason: ErrorKind::SchemeUnsupported(scheme.to_string()),
                request: Box::new(req),
            };
        }

        let host = req.host();
        if host.is_empty() {
            return AdmitOutcome::Rejected {
                reason: ErrorKind::InvalidUrl(req.url().to_string()),
                request: Box::new(req),
            };
        }

        if !state.seen.insert(req.canonical_key().to_string()) {
            return AdmitOutcome::Duplicate;
        }

        let now = Instant::now();
        let default_delay = self.default_delay;
        let FrontierState {
            buckets,
            index,
            next_seq,
            ..
        } = &mut *state;

        let bucket = buckets.entry(host.clone()).or_insert_with(|| {
            let bucket = HostBucket::new(*next_seq, default_delay, now);
            *next_seq += 1;
            bucket
        });

        let was_empty = bucket.is_empty();
        bucket.push(req);
        if was_empty {
            index.insert(bucket.index_key(), host);
        }

        drop(state);
        self.notify.notify_waiters();
        AdmitOutcome::Admitted
    }

    /// Removes and returns the globally next-eligible request
    ///
    /// Blocks until a host becomes eligible or new work is admitted.
    /// Returns `None` once the frontier is closed, either by a drain (index
    /// empty with nothing in flight) or by [`shutdown`](Self::shutdown).
    /// Each returned request counts as in flight until the caller invokes
    /// [`complete`](Self::complete).
    ///
    /// Cancellation-safe: dropping the future while it waits consumes
    /// nothing.
    pub async fn take_next(&self) -> Option<Request> {
        enum Wait {
            Deadline(Instant),
            Admission,
        }

        loop {
            // Register for wakeups before inspecting state so an admission
            // between the check and the await is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let wait = {
                let mut state = self.state.lock().expect("frontier lock poisoned");

                if state.phase == Phase::Closed {
                    return None;
                }

                match state.index.keys().next().copied() {
                    Some((due, seq)) => {
                        let now = Instant::now();
                        if due <= now {
                            let host = state
                                .index
                                .remove(&(due, seq))
                                .expect("peeked index entry vanished");
                            let FrontierState {
                                buckets,
                                index,
                                in_flight,
                                ..
                            } = &mut *state;
                            let bucket =
                                buckets.get_mut(&host).expect("indexed host has no bucket");

                            let req = bucket.pop_ready(now);
                            if !bucket.is_empty() {
                                index.insert(bucket.index_key(), host);
                            }
                            *in_flight += 1;
                            return Some(req);
                        }
                        Wait::Deadline(due)
                    }
                    None => {
                        if state.in_flight == 0 && state.phase == Phase::Draining {
                            state.phase = Phase::Closed;
                            drop(state);
                            self.notify.notify_waiters();
                            return None;
                        }
                        Wait::Admission
                    }
                }
            };

            match wait {
                Wait::Deadline(due) => {
                    // An admission may introduce an earlier-eligible bucket
                    // (or shutdown may land) before the deadline; either way
                    // we re-peek.
                    tokio::select! {
                        _ = sleep_until(due) => {}
                        _ = notified.as_mut() => {}
                    }
                }
                Wait::Admission => {
                    notified.as_mut().await;
                }
            }
        }
    }

    /// Marks one previously-taken request as finished
    ///
    /// When the last in-flight request completes against an empty index,
    /// the frontier closes and every waiting taker is released.
    ///
    /// # Panics
    ///
    /// Panics if called more times than [`take_next`](Self::take_next)
    /// returned requests; that is a scheduler bug, not a recoverable error.
    pub fn complete(&self) {
        let mut state = self.state.lock().expect("frontier lock poisoned");
        state.in_flight = state
            .in_flight
            .checked_sub(1)
            .expect("complete() without a matching take_next()");

        let drained =
            state.in_flight == 0 && state.index.is_empty() && state.phase == Phase::Draining;
        if drained {
            state.phase = Phase::Closed;
        }
        drop(state);

        if drained {
            self.notify.notify_waiters();
        }
    }

    /// Ends the seeding window
    ///
    /// From here on, an empty index with nothing in flight means the crawl
    /// is over. Called once by the scheduler after the seeds are admitted;
    /// if nothing was admitted at all the frontier closes immediately.
    pub fn start_draining(&self) {
        let mut state = self.state.lock().expect("frontier lock poisoned");
        if state.phase != Phase::Open {
            return;
        }
        state.phase = if state.index.is_empty() && state.in_flight == 0 {
            Phase::Closed
        } else {
            Phase::Draining
        };
        drop(state);
        self.notify.notify_waiters();
    }

    /// Closes the frontier immediately
    ///
    /// Waiting takers return `None`, later admissions are rejected with
    /// [`ErrorKind::ShuttingDown`], and pending requests are abandoned.
    /// In-flight requests are unaffected; workers drain them normally.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().expect("frontier lock poisoned");
        state.phase = Phase::Closed;
        drop(state);
        self.notify.notify_waiters();
    }

    /// Overrides a host's delay without touching its scheduled eligibility
    ///
    /// Used when a robots.txt crawl-delay is adopted for the host. An
    /// eligibility instant already in the past is clamped up to now; a
    /// future one stands.
    pub(crate) fn set_host_delay(&self, host: &str, delay: Duration) {
        let mut state = self.state.lock().expect("frontier lock poisoned");
        let now = Instant::now();
        let FrontierState { buckets, index, .. } = &mut *state;

        if let Some(bucket) = buckets.get_mut(host) {
            if !bucket.is_empty() {
                index.remove(&bucket.index_key());
            }
            bucket.set_delay(delay, now);
            if !bucket.is_empty() {
                index.insert(bucket.index_key(), host.to_string());
            }
        }
        drop(state);
        self.notify.notify_waiters();
    }

    /// Accounts an out-of-band fetch (robots.txt) against a host's bucket
    ///
    /// Pushes the host's eligibility out by its current delay, exactly as a
    /// normal dispatch would.
    pub(crate) fn record_fetch(&self, host: &str) {
        let mut state = self.state.lock().expect("frontier lock poisoned");
        let now = Instant::now();
        let FrontierState { buckets, index, .. } = &mut *state;

        if let Some(bucket) = buckets.get_mut(host) {
            if !bucket.is_empty() {
                index.remove(&bucket.index_key());
            }
            bucket.record_dispatch(now);
            if !bucket.is_empty() {
                index.insert(bucket.index_key(), host.to_string());
            }
        }
        drop(state);
        self.notify.notify_waiters();
    }

    /// Number of canonical URLs ever admitted
    pub fn seen_count(&self) -> usize {
        self.state.lock().expect("frontier lock poisoned").seen.len()
    }

    /// Number of requests currently queued across all hosts
    pub fn pending_count(&self) -> usize {
        let state = self.state.lock().expect("frontier lock poisoned");
        state.buckets.values().map(|b| b.len()).sum()
    }

    /// Whether the frontier has closed
    pub fn is_closed(&self) -> bool {
        self.state.lock().expect("frontier lock poisoned").phase == Phase::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Scope;
    use std::sync::Arc;

    fn request(url: &str) -> Request {
        Request::seed(url, Scope::default()).unwrap()
    }

    fn frontier(delay_ms: u64) -> Frontier {
        Frontier::new(Duration::from_millis(delay_ms))
    }

    #[test]
    fn test_admit_then_duplicate() {
        let frontier = frontier(0);
        assert!(matches!(
            frontier.admit(request("https://example.com/")),
            AdmitOutcome::Admitted
        ));
        assert!(matches!(
            frontier.admit(request("https://example.com/")),
            AdmitOutcome::Duplicate
        ));
        assert_eq!(frontier.seen_count(), 1);
        assert_eq!(frontier.pending_count(), 1);
    }

    #[test]
    fn test_fragment_variant_is_duplicate() {
        let frontier = frontier(0);
        frontier.admit(request("https://example.com/page"));
        // Canonicalization strips the fragment, so this is the same key
        assert!(matches!(
            frontier.admit(request("https://example.com/page#section")),
            AdmitOutcome::Duplicate
        ));
    }

    #[test]
    fn test_query_variant_is_distinct() {
        let frontier = frontier(0);
        frontier.admit(request("https://example.com/page"));
        assert!(matches!(
            frontier.admit(request("https://example.com/page?tab=2")),
            AdmitOutcome::Admitted
        ));
        assert_eq!(frontier.seen_count(), 2);
    }

    #[test]
    fn test_admit_rejects_non_http_scheme() {
        let frontier = frontier(0);
        let parent = request("https://example.com/");
        let bad = parent.derived(url::Url::parse("ftp://example.com/file").unwrap());
        match frontier.admit(bad) {
            AdmitOutcome::Rejected { reason, .. } => {
                assert!(matches!(reason, ErrorKind::SchemeUnsupported(_)));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_host_fifo() {
        let frontier = frontier(0);
        frontier.admit(request("https://example.com/a"));
        frontier.admit(request("https://example.com/b"));
        frontier.admit(request("https://example.com/c"));
        frontier.start_draining();

        for expected in ["/a", "/b", "/c"] {
            let req = frontier.take_next().await.unwrap();
            assert_eq!(req.url().path(), expected);
            frontier.complete();
        }
        assert!(frontier.take_next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_host_gap_enforced() {
        let frontier = frontier(100);
        frontier.admit(request("https://example.com/a"));
        frontier.admit(request("https://example.com/b"));
        frontier.start_draining();

        let start = Instant::now();
        frontier.take_next().await.unwrap();
        frontier.take_next().await.unwrap();
        assert!(Instant::now() - start >= Duration::from_millis(100));

        frontier.complete();
        frontier.complete();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cross_host_earliest_first() {
        let frontier = frontier(100);
        frontier.admit(request("https://a.example.com/1"));
        frontier.admit(request("https://b.example.com/1"));
        frontier.admit(request("https://a.example.com/2"));
        frontier.start_draining();

        let start = Instant::now();

        // Both hosts start eligible; the earlier-created bucket wins the tie
        let first = frontier.take_next().await.unwrap();
        assert_eq!(first.host(), "a.example.com");

        // b is still eligible now, a not for another 100ms
        let second = frontier.take_next().await.unwrap();
        assert_eq!(second.host(), "b.example.com");
        assert!(Instant::now() - start < Duration::from_millis(100));

        let third = frontier.take_next().await.unwrap();
        assert_eq!(third.host(), "a.example.com");
        assert!(Instant::now() - start >= Duration::from_millis(100));

        for _ in 0..3 {
            frontier.complete();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_keeps_politeness_across_refill() {
        let frontier = frontier(100);
        frontier.admit(request("https://example.com/a"));
        frontier.start_draining();

        let start = Instant::now();
        frontier.take_next().await.unwrap();

        // The bucket emptied, but its eligibility state must survive for
        // the next admission on the same host.
        frontier.admit(request("https://example.com/b"));
        frontier.take_next().await.unwrap();
        assert!(Instant::now() - start >= Duration::from_millis(100));

        frontier.complete();
        frontier.complete();
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_override_applies_to_later_dispatches() {
        let frontier = frontier(100);
        frontier.admit(request("https://example.com/a"));
        frontier.admit(request("https://example.com/b"));
        frontier.admit(request("https://example.com/c"));
        frontier.start_draining();

        let start = Instant::now();
        frontier.take_next().await.unwrap();

        // Scheduled eligibility is not retroactively extended...
        frontier.set_host_delay("example.com", Duration::from_secs(1));
        frontier.take_next().await.unwrap();
        let second_at = Instant::now() - start;
        assert!(second_at >= Duration::from_millis(100));
        assert!(second_at < Duration::from_secs(1));

        // ...but the new delay governs the gap after that dispatch.
        frontier.take_next().await.unwrap();
        assert!(Instant::now() - start >= second_at + Duration::from_secs(1));

        for _ in 0..3 {
            frontier.complete();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_fetch_pushes_next_dispatch_out() {
        let frontier = frontier(100);
        frontier.admit(request("https://example.com/a"));
        frontier.start_draining();

        let start = Instant::now();
        // Simulates the robots.txt fetch for the host: delay adopted first,
        // then the fetch is accounted like a normal dispatch.
        frontier.set_host_delay("example.com", Duration::from_secs(1));
        frontier.record_fetch("example.com");

        frontier.take_next().await.unwrap();
        assert!(Instant::now() - start >= Duration::from_secs(1));
        frontier.complete();
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_taker_released_on_drain() {
        let frontier = Arc::new(frontier(0));
        frontier.admit(request("https://example.com/a"));
        frontier.start_draining();

        let req = frontier.take_next().await.unwrap();

        // Index is empty but a request is in flight: a second taker must
        // wait, then observe the close when that request completes.
        let waiter = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.take_next().await })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        drop(req);
        frontier.complete();
        assert!(waiter.await.unwrap().is_none());
        assert!(frontier.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_discoveries_keep_crawl_alive() {
        let frontier = Arc::new(frontier(0));
        frontier.admit(request("https://example.com/a"));
        frontier.start_draining();

        let req = frontier.take_next().await.unwrap();

        let waiter = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.take_next().await })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        // A discovery admitted while in flight reaches the waiting taker
        frontier.admit(req.derived(url::Url::parse("https://example.com/b").unwrap()));
        frontier.complete();

        let taken = waiter.await.unwrap().unwrap();
        assert_eq!(taken.url().path(), "/b");
        frontier.complete();
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_frontier_waits_for_seeding() {
        let frontier = Arc::new(frontier(0));

        let waiter = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.take_next().await })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        frontier.admit(request("https://example.com/"));
        frontier.start_draining();

        assert!(waiter.await.unwrap().is_some());
        frontier.complete();
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_draining_with_nothing_admitted_closes() {
        let frontier = frontier(0);
        frontier.start_draining();
        assert!(frontier.is_closed());
        assert!(frontier.take_next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_rejects_and_releases() {
        let frontier = frontier(0);
        frontier.admit(request("https://example.com/a"));
        frontier.start_draining();
        frontier.shutdown();

        assert!(frontier.take_next().await.is_none());
        match frontier.admit(request("https://example.com/b")) {
            AdmitOutcome::Rejected { reason, .. } => {
                assert_eq!(reason, ErrorKind::ShuttingDown);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    #[should_panic(expected = "complete() without a matching take_next()")]
    fn test_complete_underflow_panics() {
        frontier(0).complete();
    }
}
