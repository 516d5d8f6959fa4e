//! Command-line interface for tweet-collect
//!
//! Provides `scrape` and `validate` subcommands.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod scrape;
mod validate;

/// Scrape tweets and merge them with existing CSV archives
#[derive(Parser)]
#[command(name = "tweet-collect")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// More logging: -v for DEBUG, -vv for TRACE
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge input archives with the search feed into one ordered CSV
    Scrape(Box<scrape::ScrapeArgs>),

    /// Check an archive for ordering problems and repeated gap markers
    Validate(validate::ValidateArgs),
}

fn log_level(verbose: u8, quiet: bool) -> Level {
    match (quiet, verbose) {
        (true, _) => Level::WARN,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        _ => Level::TRACE,
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG directives still apply; the flags set the default level.
    let filter = EnvFilter::from_default_env().add_directive(log_level(cli.verbose, cli.quiet).into());
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    match cli.command {
        Commands::Scrape(args) => scrape::run(*args),
        Commands::Validate(args) => validate::run(args),
    }
}
