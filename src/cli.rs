//! Command-line interface for the flux-future demo tool
//!
//! Runs small fan-out scenarios against the library so the parallel timing
//! and join ordering can be checked by hand.

use anyhow::{ensure, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use crate::future::{all, join5, Future};

/// Demo driver for flux futures
#[derive(Parser)]
#[command(name = "flux-future")]
#[command(about = "Exercise lazy futures and their fan-out combinators")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Runtime configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fan out sleeping producers through `all`
    All {
        /// Number of futures
        #[arg(short = 'n', long, default_value_t = 8)]
        count: usize,

        /// Sleep of each producer in milliseconds
        #[arg(short, long, default_value_t = 100)]
        delay_ms: u64,
    },

    /// Join five ready futures of different types
    Join,
}

/// Output context shared by the command handlers
#[derive(Clone)]
pub struct CliContext {
    pub verbose: bool,
    pub quiet: bool,
    start_time: Instant,
}

impl CliContext {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            start_time: Instant::now(),
        }
    }

    /// Print info message if not quiet
    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{}", message);
        }
    }

    /// Print verbose message if verbose mode enabled
    pub fn verbose(&self, message: &str) {
        if self.verbose && !self.quiet {
            println!("{} {}", "verbose:".dimmed(), message.dimmed());
        }
    }

    /// Print warning message
    pub fn warn(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", "warning:".yellow().bold(), message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "error:".red().bold(), message);
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", "success:".green().bold(), message);
        }
    }

    /// Time since the context was created
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Report of one `all` run
#[derive(Debug, Clone, PartialEq)]
pub struct FanOutReport {
    pub values: Vec<usize>,
    pub elapsed: Duration,
    pub sequential: Duration,
}

impl FanOutReport {
    /// Whether the run finished well under the sequential bound
    pub fn is_parallel(&self) -> bool {
        self.values.len() < 2 || self.elapsed < self.sequential / 2
    }
}

/// Time `count` sleeps of `delay` would take back to back, saturating at
/// `Duration::MAX`
pub fn sequential_bound(count: usize, delay: Duration) -> Duration {
    u32::try_from(count)
        .ok()
        .and_then(|count| delay.checked_mul(count))
        .unwrap_or(Duration::MAX)
}

/// Fan `count` producers sleeping `delay` each through `all`
pub fn fan_out_sleepers(count: usize, delay: Duration) -> FanOutReport {
    let futures: Vec<Future<usize>> = (0..count)
        .map(|i| {
            Future::new(move || {
                thread::sleep(delay);
                i
            })
        })
        .collect();

    let start = Instant::now();
    let values = all(futures).wait();

    FanOutReport {
        values,
        elapsed: start.elapsed(),
        sequential: sequential_bound(count, delay),
    }
}

/// Handle `flux-future all`
pub fn run_all(context: &CliContext, count: usize, delay_ms: u64) -> Result<()> {
    ensure!(count > 0, "count must be at least 1");
    ensure!(u32::try_from(count).is_ok(), "count {} is too large", count);

    context.verbose(&format!("spawning {} producers of {}ms", count, delay_ms));
    let report = fan_out_sleepers(count, Duration::from_millis(delay_ms));

    ensure!(
        report.values == (0..count).collect::<Vec<_>>(),
        "results came back out of order: {:?}",
        report.values
    );

    context.info(&format!(
        "{} futures in {:?} (sequential bound {:?})",
        count, report.elapsed, report.sequential
    ));

    if report.is_parallel() {
        context.success("fan-out ran in parallel");
    } else {
        context.warn("fan-out took more than half the sequential time");
    }

    Ok(())
}

/// Handle `flux-future join`
pub fn run_join(context: &CliContext) -> Result<()> {
    let tuple = join5(
        &Future::ready(1),
        &Future::ready("a"),
        &Future::ready(true),
        &Future::ready(2.0),
        &Future::ready('x'),
    );

    context.info(&format!("{:?}", tuple));
    context.verbose(&format!("joined in {:?}", context.elapsed()));
    Ok(())
}
