use super::{Protocol, WorkerId};
use crate::{
    loom::sync::atomic::{
        AtomicBool, AtomicU32,
        Ordering::{Acquire, Relaxed, Release},
    },
    util::{Backoff, CachePadded},
};

/// A test-and-set lock backed by a real hardware compare-and-swap.
///
/// One shared cell, `false` = free, `true` = held. `test_and_set` reads the
/// cell and, if free, claims it, as **one indivisible operation**: the
/// compare-and-swap either observes `false` and installs `true`, or fails.
/// There is no instant at which two workers can both have seen the cell
/// free, which is the whole difference between this variant and
/// [`SimulatedTas`].
///
/// `enter` spins until acquisition succeeds. Failed acquirers back off into
/// a read-only spin on the cell (the test-and-test-and-set shape) so that
/// contending workers hammer a shared read instead of a contended
/// compare-and-swap. `exit` is an ordinary store of `false`: releasing needs
/// no read-modify-write, just release ordering so the critical section's
/// writes are published before the lock looks free.
#[derive(Debug)]
pub struct AtomicTas {
    lock: CachePadded<AtomicBool>,
}

/// Test-and-set "simulated in software": the same protocol as
/// [`AtomicTas`], minus the one property that makes it work.
///
/// Here `test_and_set` is a load, a branch, and a store: three separate
/// steps over a cell that is atomic only for *visibility* (the moral
/// equivalent of a `volatile` integer). Two workers can both load 0, both
/// conclude the lock is free, and both store 1, and then both are in the
/// critical section at once. The protocol *looks* identical to the real one,
/// frequently even appears to work on a single core where preemption inside
/// the window is rare, and is unsafe on any real multiprocessor.
///
/// Like [`Unsynchronized`](super::Unsynchronized), the resulting lost
/// updates are this variant's documented outcome, not a failure. Everything
/// here is deliberately `Relaxed`: the simulation is *not allowed* to smuggle
/// in the orderings a real lock would provide.
#[derive(Debug)]
pub struct SimulatedTas {
    lock: CachePadded<AtomicU32>,
}

// === impl AtomicTas ===

impl AtomicTas {
    /// Returns a new lock, in the free state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lock: CachePadded::new(AtomicBool::new(false)),
        }
    }

    /// Attempts to claim the lock, returning whether it was acquired.
    ///
    /// This is the indivisible hardware step the protocol is built on.
    #[cfg_attr(test, track_caller)]
    fn test_and_set(&self) -> bool {
        test_dbg!(self
            .lock
            .compare_exchange(false, true, Acquire, Acquire)
            .is_ok())
    }

    #[inline]
    #[must_use]
    fn is_locked(&self) -> bool {
        self.lock.load(Relaxed)
    }
}

impl Default for AtomicTas {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol for AtomicTas {
    #[cfg_attr(test, track_caller)]
    fn enter(&self, id: WorkerId) {
        let mut boff = Backoff::new();
        while !self.test_and_set() {
            while self.is_locked() {
                boff.spin();
            }
        }
        trace!(worker = %id, "AtomicTas::enter: acquired");
    }

    #[cfg_attr(test, track_caller)]
    fn exit(&self, id: WorkerId) {
        self.lock.store(false, Release);
        trace!(worker = %id, "AtomicTas::exit: released");
    }
}

// === impl SimulatedTas ===

impl SimulatedTas {
    /// Returns a new lock cell, in the free (0) state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lock: CachePadded::new(AtomicU32::new(0)),
        }
    }

    /// The "simulated" test-and-set: check-then-act over two separate
    /// accesses.
    ///
    /// The branch between the load and the store is the reintroduced race.
    #[cfg_attr(test, track_caller)]
    fn test_and_set(&self) -> bool {
        if self.lock.load(Relaxed) == 0 {
            self.lock.store(1, Relaxed);
            return true;
        }
        false
    }
}

impl Default for SimulatedTas {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol for SimulatedTas {
    fn enter(&self, id: WorkerId) {
        let mut boff = Backoff::new();
        while !self.test_and_set() {
            boff.spin();
        }
        trace!(worker = %id, "SimulatedTas::enter: acquired (or so it thinks)");
    }

    fn exit(&self, id: WorkerId) {
        self.lock.store(0, Relaxed);
        trace!(worker = %id, "SimulatedTas::exit: released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::SharedCounter;
    use crate::loom::{
        self,
        sync::{
            atomic::{AtomicUsize, Ordering::SeqCst},
            Arc,
        },
        thread,
    };

    fn passage<P: Protocol>(proto: &P, counter: &SharedCounter, id: WorkerId, batch: u64) {
        proto.enter(id);
        proto.increment(counter, batch);
        proto.exit(id);
    }

    #[test]
    fn atomic_tas_is_exclusive() {
        loom::model(|| {
            let proto = Arc::new(AtomicTas::new());
            let counter = Arc::new(SharedCounter::new());
            let inside = Arc::new(AtomicUsize::new(0));

            let guarded_passage = |proto: &AtomicTas, counter: &SharedCounter, id, inside: &AtomicUsize| {
                proto.enter(id);
                // nobody else may already be in here, on any interleaving
                assert_eq!(inside.fetch_add(1, SeqCst), 0, "exclusion violated");
                counter.increment_by(2);
                inside.fetch_sub(1, SeqCst);
                proto.exit(id);
            };

            let t1 = thread::spawn({
                let (proto, counter, inside) = (proto.clone(), counter.clone(), inside.clone());
                move || guarded_passage(&proto, &counter, WorkerId::new(1), &inside)
            });
            guarded_passage(&proto, &counter, WorkerId::new(0), &inside);
            t1.join().unwrap();

            // under real exclusion, no interleaving loses an update
            assert_eq!(counter.read(), 4);
        });
    }

    #[test]
    fn atomic_tas_claims_once() {
        loom::model(|| {
            let proto = AtomicTas::new();
            assert!(proto.test_and_set());
            assert!(!proto.test_and_set());
            proto.exit(WorkerId::new(0));
            assert!(proto.test_and_set());
        });
    }

    #[test]
    fn simulated_tas_claims_once_sequentially() {
        loom::model(|| {
            let proto = SimulatedTas::new();
            assert!(proto.test_and_set());
            assert!(!proto.test_and_set());
            proto.exit(WorkerId::new(0));
            assert!(proto.test_and_set());
        });
    }

    #[test]
    fn simulated_tas_never_overshoots() {
        loom::model(|| {
            let proto = Arc::new(SimulatedTas::new());
            let counter = Arc::new(SharedCounter::new());

            let t1 = thread::spawn({
                let (proto, counter) = (proto.clone(), counter.clone());
                move || passage(&*proto, &counter, WorkerId::new(1), 2)
            });
            passage(&*proto, &counter, WorkerId::new(0), 2);
            t1.join().unwrap();

            // some interleavings let both workers in and lose a batch; none
            // can ever gain one
            let observed = counter.read();
            assert!(
                observed == 2 || observed == 4,
                "observed = {observed}, expected 2 or 4"
            );
        });
    }
}
