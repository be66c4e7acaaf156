//! `amanita`: a little laboratory of mutual-exclusion protocols.
//!
//! This crate races two (or more) worker threads over a single shared
//! accumulator, guarding the accumulator's deliberately non-atomic
//! read-modify-write with one of a family of critical-section protocols:
//!
//! - [`protocol::Unsynchronized`]: no protocol at all. The negative control:
//!   concurrent non-atomic read-modify-writes lose updates, and the wrong
//!   final sum is the *expected* outcome, not a failure.
//! - [`protocol::Dekker`]: the flags-only "third attempt" at Dekker's
//!   algorithm. Mutual exclusion holds, bounded waiting does not.
//! - [`protocol::Peterson`]: Peterson's algorithm with a blocking
//!   suspend/resume wait instead of a spin. **Known-incorrect by design**:
//!   the wait is vulnerable to a lost wakeup, and the resulting deadlock is
//!   one of the laboratory's exhibits.
//! - [`protocol::SimulatedTas`]: a software "simulation" of the hardware
//!   test-and-set instruction, built from a check and a store that are *not*
//!   one indivisible step. Looks correct, loses updates on real hardware.
//! - [`protocol::AtomicTas`]: the real thing, a compare-and-swap spinlock.
//! - [`protocol::AtomicAdd`]: no entry/exit protocol; the increment itself
//!   is a single atomic fetch-add, so there is no multi-step race to guard.
//!
//! The [`harness::Race`] type spawns the workers, bounds the whole run with
//! a watchdog timeout (some of the exhibits deadlock, on purpose), and
//! reports an [`harness::Outcome`] comparing the observed sum against the
//! analytically expected one. [`visibility`] holds a smaller side exhibit
//! about cross-thread visibility of relaxed writes.
//!
//! None of this is a production lock implementation. It is a teaching
//! vehicle: each protocol is a tiny concurrency state machine whose
//! correctness (or carefully preserved incorrectness) hinges on memory
//! ordering details, and the harness exists to make those details
//! observable.
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs, missing_debug_implementations)]

#[macro_use]
pub mod util;

pub(crate) mod loom;

pub mod counter;
pub mod harness;
pub mod protocol;
pub mod trace;
pub mod visibility;

#[doc(inline)]
pub use self::counter::SharedCounter;
#[doc(inline)]
pub use self::harness::{ConfigError, Outcome, Race};
#[doc(inline)]
pub use self::protocol::{Kind, Protocol, WorkerId};
