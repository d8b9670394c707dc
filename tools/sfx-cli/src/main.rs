//! sfx - register sound effects in an N64 decomp checkout
//!
//! # Commands
//!
//! - `sfx add` - Copy a sample into the project and register it as a sound
//! - `sfx probe` - Print a sample's duration in seconds and sequencer ticks
//! - `sfx next-id` - Print the hex id the next new bank would get
//!
//! # Usage
//!
//! ```bash
//! # Fully interactive: asks for the decomp directory, sample, bank and sound
//! sfx add
//!
//! # Non-interactive
//! sfx add --decomp ~/sm64 --sample bird.aiff --bank JUNGLE --sound BIRD
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

mod add;
mod next_id;
mod probe;
mod prompt;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// sfx - register sound effects in an N64 decomp checkout
#[derive(Parser)]
#[command(name = "sfx")]
#[command(about = "Register sound effects in an N64 decomp checkout")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy a sample into the project and register it as a sound
    Add(add::AddArgs),

    /// Print a sample's duration in seconds and sequencer ticks
    Probe(probe::ProbeArgs),

    /// Print the hex id the next new sound bank would get
    NextId(next_id::NextIdArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Add(args) => add::execute(args),
        Commands::Probe(args) => probe::execute(args),
        Commands::NextId(args) => next_id::execute(args),
    }
}
