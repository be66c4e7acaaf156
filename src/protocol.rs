//! The critical-section protocol family.
//!
//! Every variant in the laboratory implements the same two-phase contract:
//! [`enter`](Protocol::enter) may only return once the calling worker is
//! allowed into the critical section, and [`exit`](Protocol::exit) announces
//! that the worker has left it. What happens in between is a
//! [`SharedCounter`] batch increment, performed through
//! [`increment`](Protocol::increment) so the one variant whose increment *is*
//! the protocol ([`AtomicAdd`]) can substitute a single atomic step.
//!
//! The family is a closed set of behaviorally distinct strategies, so it is
//! modeled as one trait plus a [`Kind`] selector enum; picking a protocol is
//! configuration, not subclassing.
use crate::counter::SharedCounter;
use core::fmt;
use std::sync::Arc;

mod dekker;
mod none;
mod peterson;
mod tas;

pub use self::{
    dekker::Dekker,
    none::Unsynchronized,
    peterson::Peterson,
    tas::{AtomicTas, SimulatedTas},
};

/// A worker's stable logical identity within one race.
///
/// Identities are assigned by the harness at spawn time and passed to the
/// worker explicitly. They are *not* derived from thread names or any other
/// runtime detail; the flag-based protocols index their per-worker state by
/// this value and nothing else.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct WorkerId(usize);

// === impl WorkerId ===

impl WorkerId {
    /// Returns the identity for worker `n`.
    #[must_use]
    pub const fn new(n: usize) -> Self {
        Self(n)
    }

    /// Returns the identity of the *other* party in a two-worker race.
    ///
    /// Only meaningful for the two-party protocols, which is why they declare
    /// a [`capacity`](Protocol::capacity) of two.
    #[must_use]
    pub const fn other(self) -> Self {
        Self(self.0 ^ 1)
    }

    /// Returns the identity as a bare index.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A critical-section entry/exit protocol.
///
/// Implementations coordinate access to the critical section only through
/// their own shared state; the counter itself never locks. A protocol that
/// provides true mutual exclusion (or atomicity) makes the race harness's
/// observed sum exact; the deliberately broken variants make it shrink, or
/// make the run deadlock. Both are reportable outcomes, not errors.
pub trait Protocol: Send + Sync + fmt::Debug {
    /// Blocks (by spinning or suspending) until the calling worker may enter
    /// the critical section.
    fn enter(&self, id: WorkerId);

    /// Announces that the calling worker has left the critical section.
    fn exit(&self, id: WorkerId);

    /// Performs one batch increment inside the critical section.
    ///
    /// The default is the counter's non-atomic read-modify-write, the
    /// race-inducing operation the protocol guards. [`AtomicAdd`] overrides
    /// this with a single fetch-and-add and needs no guarding at all.
    fn increment(&self, counter: &SharedCounter, batch: u64) {
        counter.increment_by(batch);
    }

    /// The maximum number of workers this protocol can coordinate, if
    /// bounded.
    ///
    /// The flag-indexed protocols are strictly two-party; the lock-cell and
    /// atomic variants coordinate any number of workers.
    fn capacity(&self) -> Option<usize> {
        None
    }
}

/// Selects one of the laboratory's protocol variants.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, clap::ValueEnum)]
pub enum Kind {
    /// No protocol at all; the negative control that loses updates.
    None,
    /// Dekker's third attempt: intent flags only, no turn variable.
    Dekker,
    /// Peterson's algorithm with a suspend/resume wait (known-incorrect).
    Peterson,
    /// Test-and-set "simulated in software", without real atomicity.
    SoftwareTas,
    /// Test-and-set backed by a hardware compare-and-swap.
    AtomicTas,
    /// No entry/exit; the increment itself is a single atomic fetch-add.
    AtomicAdd,
}

// === impl Kind ===

impl Kind {
    /// All variants, in teaching order.
    pub const ALL: [Self; 6] = [
        Self::None,
        Self::Dekker,
        Self::Peterson,
        Self::SoftwareTas,
        Self::AtomicTas,
        Self::AtomicAdd,
    ];

    /// Constructs a fresh instance of the selected protocol.
    #[must_use]
    pub fn build(self) -> Arc<dyn Protocol> {
        match self {
            Self::None => Arc::new(Unsynchronized::new()),
            Self::Dekker => Arc::new(Dekker::new()),
            Self::Peterson => Arc::new(Peterson::new()),
            Self::SoftwareTas => Arc::new(SimulatedTas::new()),
            Self::AtomicTas => Arc::new(AtomicTas::new()),
            Self::AtomicAdd => Arc::new(AtomicAdd::new()),
        }
    }

    /// Returns the variant's human-readable name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Dekker => "dekker",
            Self::Peterson => "peterson",
            Self::SoftwareTas => "software-tas",
            Self::AtomicTas => "atomic-tas",
            Self::AtomicAdd => "atomic-add",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// The atomic-increment "protocol": no entry or exit at all.
///
/// Mutual exclusion is unnecessary here because the race-inducing multi-step
/// read-modify-write is replaced wholesale by a single atomic fetch-add; the
/// critical section has, in effect, shrunk to one indivisible instruction.
#[derive(Debug, Default)]
pub struct AtomicAdd(());

// === impl AtomicAdd ===

impl AtomicAdd {
    /// Returns the atomic-increment strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Protocol for AtomicAdd {
    fn enter(&self, _id: WorkerId) {}

    fn exit(&self, _id: WorkerId) {}

    fn increment(&self, counter: &SharedCounter, batch: u64) {
        counter.fetch_add(batch);
    }
}
