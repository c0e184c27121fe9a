//! Monotonic-clock timer wheel (spec §2 "Timer Wheel", §6 "Timer adapter
//! contract").
//!
//! Two distinct things live in this module:
//!
//!   - [`TimerWheel`]: the internal component the daemon uses to track every
//!     protocol-level deadline (HELLO/TC intervals, link validity, settle
//!     coalescing, …) against one monotonic clock. Pure data structure, no
//!     I/O — this is what the run loop's "(b) fire all timers whose deadline
//!     ≤ now" step drains.
//!   - [`TimerAdapter`]: the external collaborator trait from §6 that
//!     actually *sleeps* — an embedder (the `olsrv2d` binary) implements it
//!     on top of a real clock/reactor so the run loop can block until the
//!     wheel's next deadline instead of busy-polling.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Handle to one scheduled timer inside a [`TimerWheel`]. Stable across
/// rearm; stale after [`TimerWheel::cancel`] or firing of a one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy)]
struct Entry<T> {
    deadline_ms: u64,
    id: TimerId,
    generation: u64,
    period_ms: Option<u64>,
    payload: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline_ms == other.deadline_ms && self.id == other.id
    }
}
impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the earliest deadline sorts first.
        other.deadline_ms.cmp(&self.deadline_ms)
    }
}

/// A generic min-heap of deadlines carrying an arbitrary payload `T`
/// (typically an enum identifying which protocol event to run).
///
/// Cancellation is lazy: a cancelled entry's generation is bumped in
/// `live` so it is silently dropped when it would otherwise fire, rather
/// than requiring an O(n) heap search.
pub struct TimerWheel<T> {
    heap: BinaryHeap<Entry<T>>,
    next_id: u64,
    live: ahash::AHashMap<u64, u64>, // timer index -> current generation
}

impl<T> Default for TimerWheel<T> {
    fn default() -> Self {
        Self { heap: BinaryHeap::new(), next_id: 0, live: ahash::AHashMap::new() }
    }
}

impl<T: Copy> TimerWheel<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_id(&mut self) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.live.insert(id, 0);
        TimerId(id)
    }

    /// Schedule a one-shot timer at `now_ms + delay_ms`.
    pub fn schedule_once(&mut self, now_ms: u64, delay_ms: u64, payload: T) -> TimerId {
        let id = self.alloc_id();
        self.heap.push(Entry {
            deadline_ms: now_ms.saturating_add(delay_ms),
            id,
            generation: 0,
            period_ms: None,
            payload,
        });
        id
    }

    /// Schedule a periodic timer that rearms itself every `period_ms` after
    /// firing, starting at `now_ms + period_ms`.
    pub fn schedule_periodic(&mut self, now_ms: u64, period_ms: u64, payload: T) -> TimerId {
        let id = self.alloc_id();
        self.heap.push(Entry {
            deadline_ms: now_ms.saturating_add(period_ms),
            id,
            generation: 0,
            period_ms: Some(period_ms),
            payload,
        });
        id
    }

    /// Cancel a timer. Idempotent: cancelling twice, or cancelling an
    /// already-fired one-shot, is not an error.
    pub fn cancel(&mut self, id: TimerId) {
        if let Some(gen) = self.live.get_mut(&id.0) {
            *gen += 1;
        }
    }

    /// Idempotent-rearm: cancel `id` if present and schedule a fresh timer,
    /// reusing nothing but convenient for "push this deadline back" call
    /// sites (e.g. refreshing `L_SYM_time` on every accepted HELLO).
    pub fn rearm_once(&mut self, id: Option<TimerId>, now_ms: u64, delay_ms: u64, payload: T) -> TimerId {
        if let Some(id) = id {
            self.cancel(id);
        }
        self.schedule_once(now_ms, delay_ms, payload)
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.heap.peek().map(|e| e.deadline_ms)
    }

    /// Pop and return every timer whose deadline is `<= now_ms`, rearming
    /// periodic ones in place. Cancelled entries are silently discarded.
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<(TimerId, T)> {
        let mut fired = Vec::new();
        while let Some(top) = self.heap.peek() {
            if top.deadline_ms > now_ms {
                break;
            }
            let entry = self.heap.pop().expect("peeked Some");
            let current_gen = self.live.get(&entry.id.0).copied().unwrap_or(u64::MAX);
            if current_gen != entry.generation {
                // stale: cancelled since being scheduled
                continue;
            }
            if let Some(period) = entry.period_ms {
                self.heap.push(Entry {
                    deadline_ms: entry.deadline_ms.saturating_add(period),
                    ..entry
                });
            } else {
                self.live.remove(&entry.id.0);
            }
            fired.push((entry.id, entry.payload));
        }
        fired
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// External wakeup source (§6 "Timer adapter contract"). An embedder wires
/// this to a real reactor (e.g. `tokio::time::sleep_until`) so the run loop
/// can block rather than poll. The core never calls `now_ms`/`schedule`
/// itself except through this trait, keeping it testable with a fake clock.
pub trait TimerAdapter {
    /// Monotonic milliseconds since an arbitrary, process-lifetime-stable
    /// epoch.
    fn now_ms(&self) -> u64;

    /// Arrange for the caller to be woken (e.g. the run loop re-polls) no
    /// later than `deadline_ms`. Returns an opaque handle for `cancel`.
    fn schedule_wakeup(&mut self, deadline_ms: u64) -> WakeupId;

    fn cancel_wakeup(&mut self, id: WakeupId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WakeupId(pub u64);
