//! Probe command - print a sample's duration

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use sfx_patch::{AiffProbe, DurationProbe, duration_to_ticks};

use crate::prompt::expand_home;

/// Arguments for the probe command
#[derive(Args)]
pub struct ProbeArgs {
    /// Sample file (.aiff)
    pub sample: PathBuf,
}

/// Execute the probe command
pub fn execute(args: ProbeArgs) -> Result<()> {
    let sample = expand_home(&args.sample.to_string_lossy());
    let seconds = AiffProbe
        .probe(&sample)
        .with_context(|| format!("Failed to probe {}", sample.display()))?;
    let ticks = duration_to_ticks(seconds);

    println!("{}", sample.display());
    println!("  Duration: {:.3}s", seconds);
    println!("  Ticks:    {} ({})", ticks, ticks.0);
    Ok(())
}
