//! flux-future demo CLI
//!
//! Command-line entry point for exercising the future combinators

use clap::Parser;
use std::process;
use tracing::Level;

use flux_future::cli::{run_all, run_join, Cli, CliContext, Commands};
use flux_future::runtime::config::{self, RuntimeConfig};

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let context = CliContext::new(cli.verbose, cli.quiet);

    if let Some(path) = &cli.config {
        let installed = RuntimeConfig::from_file(path).and_then(config::install);
        if let Err(e) = installed {
            context.error(&format!("{}", e));
            process::exit(1);
        }
        context.verbose(&format!("loaded runtime configuration from {}", path.display()));
    }

    let result = match &cli.command {
        Commands::All { count, delay_ms } => run_all(&context, *count, *delay_ms),
        Commands::Join => run_join(&context),
    };

    if let Err(e) = result {
        context.error(&format!("{}", e));
        process::exit(1);
    }
}
