//! Subscriber setup for the `amanita` binary.
//!
//! Experiment logging goes to stderr so that the machine-readable outcome
//! lines on stdout stay clean.
use color_eyre::eyre::Result;
use tracing_subscriber::filter::EnvFilter;

/// Initializes the global tracing subscriber from a filter directive.
///
/// The directive comes from `--log` / `RUST_LOG`; parse failures are
/// reported to the caller rather than silently swallowed.
pub fn try_init(filter: &str) -> Result<()> {
    use tracing_subscriber::prelude::*;

    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .without_time();

    tracing_subscriber::registry()
        .with(fmt)
        .with(EnvFilter::try_new(filter)?)
        .try_init()?;
    Ok(())
}
