use amanita::{harness::Race, protocol::Kind, visibility::VisibilityProbe, Outcome};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "amanita",
    about = "a little laboratory of mutual-exclusion protocols, several of which are poisonous by design",
    version
)]
struct Options {
    /// Which experiment to run?
    #[command(subcommand)]
    cmd: Command,

    /// Configures experiment logging.
    #[arg(
        short,
        long,
        env = "RUST_LOG",
        default_value = "amanita=info,warn",
        global = true
    )]
    log: String,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Race workers over the shared accumulator under a chosen protocol.
    ///
    /// A lost-update mismatch or a detected deadlock is a reported
    /// experimental result, not a failure: the process exits 0 either way.
    Run {
        /// The critical-section protocol guarding the accumulator.
        #[arg(value_enum)]
        protocol: Kind,

        /// Read-modify-write passages per worker.
        #[arg(long, default_value_t = Race::DEFAULT_ITERATIONS)]
        iterations: u64,

        /// Amount added to the accumulator (one by one) per passage.
        #[arg(long, default_value_t = Race::DEFAULT_BATCH)]
        batch: u64,

        /// Number of racing workers.
        #[arg(long, default_value_t = Race::DEFAULT_WORKERS)]
        workers: usize,

        /// Wall-clock bound (seconds) before a run is declared deadlocked.
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,

        /// How many independent runs to perform.
        #[arg(long, default_value_t = 1)]
        trials: u64,

        /// Injected delay (microseconds) between the suspend/resume
        /// variant's wait check and its suspend call; widens the
        /// lost-wakeup window so the deadlock reproduces on demand.
        #[arg(long)]
        suspend_gap_micros: Option<u64>,
    },

    /// Probe cross-thread visibility of two relaxed writes.
    Visibility {
        /// How many publish/observe rounds to run.
        #[arg(long, default_value_t = 10_000)]
        trials: u64,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let opts = Options::parse();
    amanita::trace::try_init(&opts.log)?;

    match opts.cmd {
        Command::Run {
            protocol,
            iterations,
            batch,
            workers,
            timeout_secs,
            trials,
            suspend_gap_micros,
        } => {
            let mut race = Race::new(protocol)
                .iterations(iterations)
                .batch(batch)
                .workers(workers)
                .timeout(Duration::from_secs(timeout_secs));
            if let Some(gap) = suspend_gap_micros {
                race = race.suspend_gap(Duration::from_micros(gap));
            }

            tracing::info!(
                %protocol,
                iterations,
                batch,
                workers,
                trials,
                "racing workers over the shared accumulator"
            );
            for trial in 0..trials {
                let outcome = race
                    .run()
                    .wrap_err("the experiment configuration is invalid")?;
                report(trial, &outcome);
            }
        }
        Command::Visibility { trials } => {
            tracing::info!(trials, "probing cross-thread visibility");
            let histogram = VisibilityProbe::new(trials).run();
            for ((x, y), count) in &histogram {
                println!("x={x} y={y} count={count}");
            }
        }
    }

    Ok(())
}

fn report(trial: u64, outcome: &Outcome) {
    if outcome.deadlocked {
        tracing::warn!(
            trial,
            "both workers wedged; the watchdog called the run deadlocked"
        );
    } else if !outcome.matched {
        tracing::warn!(
            trial,
            lost = outcome.expected - outcome.observed,
            "updates went missing"
        );
    } else {
        tracing::info!(trial, observed = outcome.observed, "sums agree");
    }
    println!("trial={trial} {outcome}");
}
