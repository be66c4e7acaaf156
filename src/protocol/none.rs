use super::{Protocol, WorkerId};

/// The absence of a protocol: `enter` and `exit` are no-ops.
///
/// This is the laboratory's negative control. Two workers running the
/// counter's non-atomic read-modify-write with nothing guarding it will,
/// with overwhelming probability at any interesting scale, overwrite each
/// other's batches and report a final sum below the expected one. That wrong
/// sum *is* the documented outcome of this variant; nothing is raised.
///
/// The loss is probabilistic, never guaranteed: a run where the scheduler
/// happens to serialize every passage produces an exact sum, and the final
/// value can never exceed the expected one because every path only adds.
#[derive(Debug, Default)]
pub struct Unsynchronized(());

// === impl Unsynchronized ===

impl Unsynchronized {
    /// Returns the no-op protocol.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Protocol for Unsynchronized {
    fn enter(&self, _id: WorkerId) {}

    fn exit(&self, _id: WorkerId) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::SharedCounter;
    use crate::loom::{self, sync::Arc, thread};

    #[test]
    fn loses_updates_but_never_gains() {
        loom::model(|| {
            let proto = Arc::new(Unsynchronized::new());
            let counter = Arc::new(SharedCounter::new());

            let t1 = thread::spawn({
                let (proto, counter) = (proto.clone(), counter.clone());
                move || {
                    let id = WorkerId::new(1);
                    proto.enter(id);
                    proto.increment(&counter, 3);
                    proto.exit(id);
                }
            });

            let id = WorkerId::new(0);
            proto.enter(id);
            proto.increment(&counter, 3);
            proto.exit(id);
            t1.join().unwrap();

            let observed = counter.read();
            assert!(
                observed == 3 || observed == 6,
                "observed = {observed}, expected 3 or 6"
            );
        });
    }
}
