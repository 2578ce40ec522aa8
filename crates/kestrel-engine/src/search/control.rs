//! Cooperative cancellation: the shared stop flag and the search clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Upper bound on worker threads; sizes the per-thread reset flags.
pub const MAX_THREADS: usize = 256;

/// Nodes a thread may visit between clock checks.
const CALLS_PER_CHECK: u32 = 4096;

/// Decides when a search must stop.
///
/// The search polls [`poll`](SearchControl::poll) at every node. Each thread
/// counts its own calls; once any thread passes [`CALLS_PER_CHECK`] it reads
/// the clock and asks every thread to restart its count, so the clock is read
/// roughly once per 4096 nodes across the whole pool.
pub struct SearchControl {
    stopped: Arc<AtomicBool>,
    start: Instant,
    soft_limit: Option<Duration>,
    hard_limit: Option<Duration>,
    reset_calls: Box<[AtomicBool]>,
}

impl SearchControl {
    fn with_limits(stopped: Arc<AtomicBool>, soft: Option<Duration>, hard: Option<Duration>) -> Self {
        Self {
            stopped,
            start: Instant::now(),
            soft_limit: soft,
            hard_limit: hard,
            reset_calls: (0..MAX_THREADS).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    /// No time limit; only the external stop flag ends the search.
    pub fn new_infinite(stopped: Arc<AtomicBool>) -> Self {
        Self::with_limits(stopped, None, None)
    }

    /// Clock starts now. No new iteration begins after `soft`; the search is
    /// aborted mid-iteration once `hard` has passed.
    pub fn new_timed(stopped: Arc<AtomicBool>, soft: Duration, hard: Duration) -> Self {
        Self::with_limits(stopped, Some(soft), Some(hard))
    }

    /// Raise the stop flag.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    /// Count one node for `thread` and read the clock when the count runs out.
    #[inline]
    pub fn poll(&self, thread: usize, calls: &mut u32) {
        let reset = &self.reset_calls[thread];
        if reset.load(Ordering::Relaxed) {
            reset.store(false, Ordering::Relaxed);
            *calls = 0;
        }
        *calls += 1;
        if *calls > CALLS_PER_CHECK {
            for flag in self.reset_calls.iter() {
                flag.store(true, Ordering::Relaxed);
            }
            self.check_time();
        }
    }

    /// Raise the stop flag if the hard limit has passed.
    pub fn check_time(&self) {
        if let Some(hard) = self.hard_limit
            && self.elapsed() >= hard
        {
            self.stop();
        }
    }

    /// Whether iterative deepening should give up before starting another iteration.
    pub fn should_stop_iterating(&self) -> bool {
        if self.is_stopped() {
            return true;
        }
        self.soft_limit.is_some_and(|soft| self.elapsed() >= soft)
    }

    /// Time since the control was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// The shared stop flag.
    pub fn stop_flag(&self) -> &Arc<AtomicBool> {
        &self.stopped
    }
}

impl std::fmt::Debug for SearchControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchControl")
            .field("stopped", &self.is_stopped())
            .field("soft_limit", &self.soft_limit)
            .field("hard_limit", &self.hard_limit)
            .finish()
    }
}
