//! The race harness: spawns the workers, bounds the run, reports the score.
use crate::{
    counter::SharedCounter,
    protocol::{Kind, Peterson, Protocol, WorkerId},
};
use core::fmt;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering::SeqCst},
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

/// One mutual-exclusion experiment: a protocol, some workers, one counter.
///
/// A `Race` is a reusable description; every [`run`](Self::run) builds a
/// fresh counter and a fresh protocol instance, spawns `workers` threads
/// each performing `iterations` passages of `enter → increment(batch) →
/// exit`, joins them, and compares the observed sum against the expected
/// one. Nothing is retried: a mismatch is the experiment's result, not an
/// error.
///
/// Because several of the laboratory's protocols can wedge both workers
/// forever (deliberately so), the whole run is bounded by a wall-clock
/// [`timeout`](Self::timeout). A run that blows the deadline is reported as
/// deadlocked; its workers are abandoned in place, which is safe precisely
/// because they are, by construction, never coming back.
#[derive(Debug, Clone)]
pub struct Race {
    kind: Kind,
    workers: usize,
    iterations: u64,
    batch: u64,
    timeout: Duration,
    suspend_gap: Option<Duration>,
}

/// The result of one race.
///
/// This is the full output contract: the observed and expected sums, whether
/// they matched, whether the watchdog declared the run deadlocked, and the
/// instrumented worst-case occupancy of the critical section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// The counter's final value.
    pub observed: u64,
    /// `batch × iterations × workers`.
    pub expected: u64,
    /// Whether the run completed with `observed == expected`.
    pub matched: bool,
    /// Whether the watchdog gave up waiting for the workers.
    pub deadlocked: bool,
    /// The most workers ever observed inside the critical section at once.
    ///
    /// Under a protocol that actually provides mutual exclusion this is at
    /// most 1; the broken variants routinely exceed it. (This is a sampled
    /// witness: a value of 1 from a single run is evidence, not proof.)
    pub max_occupancy: usize,
}

/// A rejected experiment configuration.
///
/// Configuration is validated before any thread is spawned; these are the
/// only errors the harness produces. (Counts are unsigned, so the degenerate
/// value to reject is zero rather than a negative.)
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A race needs at least one worker.
    #[error("at least one worker is required")]
    NoWorkers,
    /// Zero iterations would measure nothing.
    #[error("iteration count must be nonzero")]
    NoIterations,
    /// Zero-sized batches would measure nothing.
    #[error("batch size must be nonzero")]
    NoBatch,
    /// More workers requested than the protocol can coordinate.
    #[error("the {protocol} protocol coordinates at most {capacity} workers ({requested} requested)")]
    TooManyWorkers {
        /// The selected protocol's name.
        protocol: &'static str,
        /// How many workers that protocol supports.
        capacity: usize,
        /// How many were asked for.
        requested: usize,
    },
    /// The expected sum does not fit in the counter.
    #[error("expected sum overflows the counter ({batch} × {iterations} × {workers})")]
    SumOverflow {
        /// Requested batch size.
        batch: u64,
        /// Requested iterations per worker.
        iterations: u64,
        /// Requested worker count.
        workers: usize,
    },
}

/// Tracks how many workers are inside the critical section, and the worst
/// case ever seen.
#[derive(Debug, Default)]
struct Occupancy {
    current: AtomicUsize,
    max: AtomicUsize,
}

// === impl Race ===

impl Race {
    /// Default batch size added per passage.
    pub const DEFAULT_BATCH: u64 = 10_000;
    /// Default passages per worker.
    pub const DEFAULT_ITERATIONS: u64 = 10_000;
    /// Default number of racing workers.
    pub const DEFAULT_WORKERS: usize = 2;
    /// Default watchdog deadline, far above any completing run.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Returns a race over the given protocol with the classroom defaults:
    /// two workers, 10 000 passages of 10 000 each.
    #[must_use]
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            workers: Self::DEFAULT_WORKERS,
            iterations: Self::DEFAULT_ITERATIONS,
            batch: Self::DEFAULT_BATCH,
            timeout: Self::DEFAULT_TIMEOUT,
            suspend_gap: None,
        }
    }

    /// Sets the number of racing workers.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the number of passages each worker performs.
    #[must_use]
    pub fn iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the amount added to the counter per passage.
    #[must_use]
    pub fn batch(mut self, batch: u64) -> Self {
        self.batch = batch;
        self
    }

    /// Sets the watchdog deadline for the whole run.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Widens the suspend/resume variant's lost-wakeup window.
    ///
    /// Only the [`Peterson`] protocol has such a window; for every other
    /// protocol this setting is ignored.
    #[must_use]
    pub fn suspend_gap(mut self, gap: Duration) -> Self {
        self.suspend_gap = Some(gap);
        self
    }

    /// The analytically expected final sum, if it fits the counter.
    #[must_use]
    pub fn expected(&self) -> Option<u64> {
        self.batch
            .checked_mul(self.iterations)?
            .checked_mul(u64::try_from(self.workers).ok()?)
    }

    /// Runs the experiment once.
    ///
    /// Validates the configuration, spawns the workers, waits for them all
    /// (or for the watchdog), and scores the result. Only configuration
    /// problems are errors; lost updates and deadlocks come back inside the
    /// [`Outcome`].
    pub fn run(&self) -> Result<Outcome, ConfigError> {
        let protocol = self.build_protocol();
        let expected = self.validate(protocol.capacity())?;
        let span = tracing::info_span!("race", protocol = %self.kind);
        let _entered = span.enter();

        let counter = Arc::new(SharedCounter::new());
        let occupancy = Arc::new(Occupancy::default());
        let (done_tx, done_rx) = mpsc::channel();

        let mut handles = Vec::with_capacity(self.workers);
        for n in 0..self.workers {
            let protocol = protocol.clone();
            let counter = counter.clone();
            let occupancy = occupancy.clone();
            let done_tx = done_tx.clone();
            let (iterations, batch) = (self.iterations, self.batch);
            let handle = thread::Builder::new()
                .name(format!("worker-{n}"))
                .spawn(move || {
                    let id = WorkerId::new(n);
                    for _ in 0..iterations {
                        protocol.enter(id);
                        occupancy.arrive();
                        protocol.increment(&counter, batch);
                        occupancy.depart();
                        protocol.exit(id);
                    }
                    // the receiver only hangs up once the watchdog has
                    // already given up on us
                    let _ = done_tx.send(id);
                })
                .expect("spawning a worker thread should succeed");
            handles.push(handle);
        }
        // only the workers hold senders now, so a disconnect means they are
        // all gone
        drop(done_tx);

        let deadlocked = !self.await_workers(done_rx);
        if deadlocked {
            tracing::warn!(
                timeout = ?self.timeout,
                "workers still blocked at the deadline; declaring the run deadlocked"
            );
            // The stragglers are spinning or suspended with no one left to
            // free them; there is no way to interrupt them, so leave them
            // behind. Dropping the handles detaches the threads.
        } else {
            for handle in handles {
                if let Err(panic) = handle.join() {
                    std::panic::resume_unwind(panic);
                }
            }
        }

        let observed = counter.read();
        let outcome = Outcome {
            observed,
            expected,
            matched: !deadlocked && observed == expected,
            deadlocked,
            max_occupancy: occupancy.max_seen(),
        };
        tracing::debug!(
            observed = outcome.observed,
            expected = outcome.expected,
            matched = outcome.matched,
            deadlocked = outcome.deadlocked,
            max_occupancy = outcome.max_occupancy,
            "race finished"
        );
        Ok(outcome)
    }

    /// Waits until every worker has reported in, or the deadline passes.
    /// Returns whether they all made it.
    fn await_workers(&self, done_rx: mpsc::Receiver<WorkerId>) -> bool {
        let deadline = Instant::now() + self.timeout;
        let mut finished = 0;
        while finished < self.workers {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match done_rx.recv_timeout(remaining) {
                Ok(_id) => {
                    test_debug!(worker = %_id, "worker finished");
                    finished += 1;
                }
                Err(RecvTimeoutError::Timeout) => return false,
                // every sender dropped: the remaining workers are gone
                // without reporting in (i.e. they panicked); joining the
                // handles will surface that
                Err(RecvTimeoutError::Disconnected) => return true,
            }
        }
        true
    }

    fn validate(&self, capacity: Option<usize>) -> Result<u64, ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.iterations == 0 {
            return Err(ConfigError::NoIterations);
        }
        if self.batch == 0 {
            return Err(ConfigError::NoBatch);
        }
        if let Some(capacity) = capacity {
            if self.workers > capacity {
                return Err(ConfigError::TooManyWorkers {
                    protocol: self.kind.name(),
                    capacity,
                    requested: self.workers,
                });
            }
        }
        self.expected().ok_or(ConfigError::SumOverflow {
            batch: self.batch,
            iterations: self.iterations,
            workers: self.workers,
        })
    }

    fn build_protocol(&self) -> Arc<dyn Protocol> {
        match (self.kind, self.suspend_gap) {
            (Kind::Peterson, Some(gap)) => Arc::new(Peterson::new().with_suspend_gap(gap)),
            (kind, _) => kind.build(),
        }
    }
}

// === impl Outcome ===

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "observed={} expected={} matched={} deadlocked={} max_occupancy={}",
            self.observed, self.expected, self.matched, self.deadlocked, self.max_occupancy
        )
    }
}

// === impl Occupancy ===

impl Occupancy {
    fn arrive(&self) {
        let now = self.current.fetch_add(1, SeqCst) + 1;
        self.max.fetch_max(now, SeqCst);
    }

    fn depart(&self) {
        self.current.fetch_sub(1, SeqCst);
    }

    fn max_seen(&self) -> usize {
        self.max.load(SeqCst)
    }
}
