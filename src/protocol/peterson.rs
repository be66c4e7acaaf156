use super::{Protocol, WorkerId};
use crate::{
    loom::sync::atomic::{AtomicBool, AtomicUsize, Ordering::SeqCst},
    util::CachePadded,
};
use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// Peterson's algorithm with a suspend/resume wait. **Known-incorrect by
/// design**; do not fix it.
///
/// This variant adds a shared `turn` to the intent flags and, instead of
/// spinning, puts a worker that must yield to sleep until the other worker
/// wakes it on exit. The entry condition is textbook Peterson: raise your
/// flag, give the turn away, and wait while the other worker wants in *and*
/// holds the turn.
///
/// The poison is in the wait itself. "Check the wait condition, then
/// suspend" is two steps, and nothing makes them atomic with respect to the
/// other worker's "lower flag, then resume". The fatal interleaving:
///
/// 1. worker A checks the condition: true, it must wait;
/// 2. worker B leaves the critical section, lowers its flag, and resumes A.
///    A is not suspended yet, so the resume evaporates;
/// 3. B laps around and blocks on its own entry (A's flag is up and B has
///    just handed the turn to A, so B genuinely must wait);
/// 4. A finally suspends, waiting for a wakeup that was already spent.
///
/// Both workers are now asleep and each one's only waker is the other: a
/// lost wakeup turned into a permanent deadlock. The race harness detects it
/// by timeout; the protocol itself has no way to notice.
///
/// Forced suspend/resume of another thread is long gone from sane runtimes,
/// so the wait is reproduced with a per-worker suspend cell: a mutex and
/// condvar pair whose `resume` is a bare notify carrying **no state**. Not
/// remembering wakeups is exactly what makes the cell faithful to the
/// original primitive; a cell that latched a "woken" bit (the way a
/// well-built waker cell does) would quietly repair the algorithm.
///
/// The window between check and suspend is a handful of instructions wide,
/// so on a fast machine the deadlock can take many runs to show up. An
/// optional [`suspend gap`](Self::with_suspend_gap) stretches that window by
/// sleeping between the two steps, making the lost wakeup reproducible on
/// demand.
#[derive(Debug)]
pub struct Peterson {
    wants: [CachePadded<AtomicBool>; 2],
    turn: CachePadded<AtomicUsize>,
    bench: [SuspendCell; 2],
    suspend_gap: Option<Duration>,
}

/// One worker's parking spot: a condvar whose notify carries no memory.
///
/// `resume` on a cell nobody is suspended on is silently lost, matching the
/// semantics of the deprecated thread-suspension primitives this variant
/// demonstrates against.
#[derive(Debug, Default)]
struct SuspendCell {
    lock: Mutex<()>,
    wake: Condvar,
}

// === impl Peterson ===

impl Peterson {
    /// Returns a new protocol instance with both flags down.
    #[must_use]
    pub fn new() -> Self {
        Self {
            wants: [
                CachePadded::new(AtomicBool::new(false)),
                CachePadded::new(AtomicBool::new(false)),
            ],
            turn: CachePadded::new(AtomicUsize::new(0)),
            bench: [SuspendCell::default(), SuspendCell::default()],
            suspend_gap: None,
        }
    }

    /// Injects a delay between the wait-condition check and the suspend
    /// call.
    ///
    /// The lost-wakeup window is naturally a few instructions wide; widening
    /// it to `gap` makes the deadlock demonstrable in a bounded number of
    /// runs instead of a statistical eventually. The gap only applies on the
    /// contended path, so an uncontended run is unaffected.
    #[must_use]
    pub fn with_suspend_gap(mut self, gap: Duration) -> Self {
        self.suspend_gap = Some(gap);
        self
    }
}

impl Default for Peterson {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol for Peterson {
    fn enter(&self, id: WorkerId) {
        let other = id.other();
        self.wants[id.as_usize()].store(true, SeqCst);
        self.turn.store(other.as_usize(), SeqCst);

        while self.wants[other.as_usize()].load(SeqCst)
            && self.turn.load(SeqCst) == other.as_usize()
        {
            // The other worker may lower its flag and spend our wakeup
            // anywhere in here. That is the documented bug.
            if let Some(gap) = self.suspend_gap {
                std::thread::sleep(gap);
            }
            test_debug!(worker = %id, "Peterson::enter: suspending");
            self.bench[id.as_usize()].suspend();
            test_debug!(worker = %id, "Peterson::enter: resumed");
        }
    }

    fn exit(&self, id: WorkerId) {
        let other = id.other();
        self.wants[id.as_usize()].store(false, SeqCst);
        // A resume aimed at a worker that is not suspended is harmless (to
        // the resumer): always wake the other side.
        self.bench[other.as_usize()].resume();
    }

    fn capacity(&self) -> Option<usize> {
        Some(2)
    }
}

// === impl SuspendCell ===

impl SuspendCell {
    /// Blocks the calling worker until the next `resume`.
    fn suspend(&self) {
        let mut parked = self.lock.lock();
        self.wake.wait(&mut parked);
    }

    /// Wakes the worker suspended on this cell, if there is one *right now*.
    fn resume(&self) {
        self.wake.notify_one();
    }
}
