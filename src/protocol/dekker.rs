use super::{Protocol, WorkerId};
use crate::{
    loom::sync::atomic::{
        AtomicBool,
        Ordering::{Release, SeqCst},
    },
    util::{Backoff, CachePadded},
};

/// Dekker's **third attempt**: per-worker intent flags, no turn variable.
///
/// `enter` raises the calling worker's flag and then spins until the other
/// worker's flag is down; `exit` lowers the flag again. Because a worker
/// raises its own flag *before* checking the other's, both workers can never
/// be in the critical section at once: whoever's store comes second in the
/// total order must observe the first worker's raised flag and wait.
///
/// What this attempt gives up, by design, is everything else the full
/// algorithm's turn variable buys:
///
/// - **No bounded waiting.** Nothing stops one worker from lapping the other
///   indefinitely while the loser keeps sampling at unlucky instants.
/// - **The critical instant.** If both workers raise their flags before
///   either samples the other's, each sees the other's intent and both spin
///   with no one left to lower a flag. The race harness's watchdog exists to
///   turn that state into a reported outcome instead of a hung process.
///
/// The flag store and the cross-flag load are both `SeqCst`: the correctness
/// argument needs this worker's store ordered *before* its subsequent load
/// in the global order, and release/acquire cannot order a store against a
/// later load. With plain (unordered) cells, both workers could observe each
/// other's flag as still down and walk into the critical section together.
#[derive(Debug)]
pub struct Dekker {
    wants: [CachePadded<AtomicBool>; 2],
}

// === impl Dekker ===

impl Dekker {
    /// Returns a new protocol instance with both flags down.
    #[must_use]
    pub fn new() -> Self {
        Self {
            wants: [
                CachePadded::new(AtomicBool::new(false)),
                CachePadded::new(AtomicBool::new(false)),
            ],
        }
    }
}

impl Default for Dekker {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol for Dekker {
    fn enter(&self, id: WorkerId) {
        let other = id.other();
        self.wants[id.as_usize()].store(true, SeqCst);
        trace!(worker = %id, "Dekker::enter: raised flag");

        let mut boff = Backoff::new();
        while self.wants[other.as_usize()].load(SeqCst) {
            boff.spin();
        }
        trace!(worker = %id, "Dekker::enter: entered");
    }

    fn exit(&self, id: WorkerId) {
        self.wants[id.as_usize()].store(false, Release);
        trace!(worker = %id, "Dekker::exit: lowered flag");
    }

    fn capacity(&self) -> Option<usize> {
        Some(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // No model test: the both-flags-raised state is a genuine livelock, and
    // the model checker (correctly) refuses to explore past it. The race
    // harness tests cover the contended case under a watchdog.

    #[test]
    fn uncontended_passages_complete() {
        crate::loom::model(|| {
            let proto = Dekker::new();
            let id = WorkerId::new(0);
            for _ in 0..3 {
                proto.enter(id);
                proto.exit(id);
            }
        });
    }

    #[test]
    fn flag_follows_the_passage() {
        crate::loom::model(|| {
            let proto = Dekker::new();
            let id = WorkerId::new(1);
            proto.enter(id);
            assert!(proto.wants[1].load(SeqCst));
            assert!(!proto.wants[0].load(SeqCst));
            proto.exit(id);
            assert!(!proto.wants[1].load(SeqCst));
        });
    }
}
