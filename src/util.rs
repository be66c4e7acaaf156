//! Reusable utilities for the protocol implementations.
//!
//! This module provides:
//!
//! - [`Backoff`]: exponential backoff for spin loops
//! - [`CachePadded`]: pads and aligns a value to the size of a cache line
//!
//! plus the crate's internal logging macros.

/// Emits a `tracing` trace-level event.
///
/// Protocol hot paths go through this alias so the call sites stay terse.
macro_rules! trace {
    ($($t:tt)*) => { tracing::trace!($($t)*) }
}

#[cfg(not(any(test, feature = "ultraverbose")))]
macro_rules! test_debug {
    ($($t:tt)*) => {};
}

#[cfg(any(test, feature = "ultraverbose"))]
macro_rules! test_debug {
    ($($t:tt)*) => { tracing::debug!($($t)*) }
}

#[cfg(not(any(test, feature = "ultraverbose")))]
macro_rules! test_dbg {
    ($e:expr) => {
        $e
    };
}

#[cfg(any(test, feature = "ultraverbose"))]
macro_rules! test_dbg {
    ($e:expr) => {
        match $e {
            e => {
                tracing::debug!(
                    location = %core::panic::Location::caller(),
                    "{} = {:?}",
                    stringify!($e),
                    &e
                );
                e
            }
        }
    };
}

mod backoff;
mod cache_pad;

pub use self::{backoff::Backoff, cache_pad::CachePadded};
