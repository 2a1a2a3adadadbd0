use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::task::Waker;
use std::time::Instant;

/// An entry in the loop timer queue.
///
/// `TimerEntry` represents a scheduled wake-up at a specific
/// deadline, stored in a binary heap ordered by deadline. Entries
/// with the same deadline fire in insertion order.
///
/// The entry may be cancelled before it fires.
pub(crate) struct TimerEntry {
    /// The time at which the timer should fire.
    pub(crate) deadline: Instant,

    /// Insertion sequence number, used as a tie-breaker.
    pub(crate) seq: u64,

    /// Waker to notify when the deadline is reached.
    pub(crate) waker: Waker,

    /// Cancellation flag shared with the associated sleep future.
    pub(crate) cancelled: Arc<AtomicBool>,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    /// Orders timer entries by deadline, then by insertion.
    ///
    /// The comparison is **reversed** so that a `BinaryHeap<TimerEntry>`
    /// behaves as a min-heap.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
