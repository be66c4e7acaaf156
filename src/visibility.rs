//! A side exhibit: what one thread's writes look like from another.
//!
//! One worker publishes two cells in program order (`x = 3`, then `y = 4`)
//! with relaxed stores; the other reads them in the *opposite* order (`y`
//! first, then `x`). Repeating the round many times builds a histogram of
//! the pairs the reader actually observed:
//!
//! - `(0, 0)`: the reader ran first;
//! - `(3, 0)`: the reader ran between the two writes;
//! - `(3, 4)`: the writer ran first;
//! - `(0, 4)`: the punchline. The reader saw the *second* write but not the
//!   *first*. With relaxed orderings nothing forbids it; on strongly-ordered
//!   hardware it may never show up in practice, which is itself part of the
//!   lesson (absence of evidence is not a memory-model guarantee).
//!
//! No observation outside those four is possible: each cell independently
//! shows either its initial value or its published one.
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU32, Ordering::Relaxed},
        Arc, Barrier,
    },
    thread,
};

/// The value published to `x`.
pub const PUBLISHED_X: u32 = 3;
/// The value published to `y`.
pub const PUBLISHED_Y: u32 = 4;

/// How often each `(x, y)` pair was observed, keyed by the pair.
pub type Histogram = BTreeMap<(u32, u32), u64>;

/// A repeated two-thread visibility experiment.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityProbe {
    trials: u64,
}

// === impl VisibilityProbe ===

impl VisibilityProbe {
    /// Returns a probe that runs `trials` rounds.
    #[must_use]
    pub fn new(trials: u64) -> Self {
        Self { trials }
    }

    /// Runs the probe and returns the observation histogram.
    ///
    /// Each round is bracketed by barriers: both threads start the round
    /// together, and the cells are reset only after the reader has recorded
    /// its observation.
    #[must_use]
    pub fn run(&self) -> Histogram {
        let x = Arc::new(AtomicU32::new(0));
        let y = Arc::new(AtomicU32::new(0));
        let start = Arc::new(Barrier::new(2));
        let end = Arc::new(Barrier::new(2));
        let trials = self.trials;

        let writer = thread::Builder::new()
            .name("publisher".into())
            .spawn({
                let (x, y) = (x.clone(), y.clone());
                let (start, end) = (start.clone(), end.clone());
                move || {
                    for _ in 0..trials {
                        start.wait();
                        x.store(PUBLISHED_X, Relaxed);
                        y.store(PUBLISHED_Y, Relaxed);
                        end.wait();
                        // reset for the next round; the start barrier
                        // publishes this to the reader
                        x.store(0, Relaxed);
                        y.store(0, Relaxed);
                    }
                }
            })
            .expect("spawning the publisher thread should succeed");

        let mut histogram = Histogram::new();
        for _ in 0..trials {
            start.wait();
            // read in the opposite order of the writes
            let observed_y = y.load(Relaxed);
            let observed_x = x.load(Relaxed);
            *histogram.entry((observed_x, observed_y)).or_insert(0) += 1;
            end.wait();
        }

        writer.join().expect("the publisher thread never panics");
        histogram
    }

    /// Whether `observation` is one of the four explainable outcomes.
    #[must_use]
    pub fn allowed(observation: (u32, u32)) -> bool {
        matches!(observation, (0 | PUBLISHED_X, 0 | PUBLISHED_Y))
    }
}
