//! Add command - register a sample as a new sound
//!
//! Values not given on the command line are asked for in order: decomp
//! directory, sample, bank, sound. A bad directory or sample ends the run;
//! a bad bank or sound name is asked for again.

use anyhow::{Context, Result};
use clap::Args;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use sfx_patch::{AiffProbe, Decomp, RegistrationReport, SoundRegistration, register_sound};

use crate::prompt::{Prompter, expand_home};

/// Arguments for the add command
#[derive(Args)]
pub struct AddArgs {
    /// Path to the decomp checkout (the directory containing sm64.ld)
    #[arg(short, long)]
    pub decomp: Option<PathBuf>,

    /// Sample file to add (.aiff)
    #[arg(long)]
    pub sample: Option<PathBuf>,

    /// Sound bank name, created if it does not exist yet
    #[arg(short, long)]
    pub bank: Option<String>,

    /// Sound name
    #[arg(short, long)]
    pub sound: Option<String>,
}

/// Fill in everything the command line left out.
fn resolve<R: BufRead, W: Write>(
    args: AddArgs,
    prompter: &mut Prompter<R, W>,
) -> Result<(Decomp, SoundRegistration)> {
    let root = match args.decomp {
        Some(path) => expand_home(&path.to_string_lossy()),
        None => prompter.ask_path("Decomp directory")?,
    };
    let decomp = Decomp::open(&root)?;

    let sample = match args.sample {
        Some(path) => expand_home(&path.to_string_lossy()),
        None => prompter.ask_path("Sample file (.aiff)")?,
    };
    // Also checked by register_sound; here it ends the run before the name prompts
    decomp.check_sample(&sample)?;

    let bank = prompter.identifier(args.bank, "Sound bank name")?;
    let sound = prompter.identifier(args.sound, "Sound name")?;

    Ok((
        decomp,
        SoundRegistration {
            sample,
            bank,
            sound,
        },
    ))
}

fn print_report(report: &RegistrationReport, request: &SoundRegistration) {
    if report.is_duplicate() {
        println!(
            "Sound '{}' is already registered in bank '{}'; nothing to do.",
            request.sound, request.bank
        );
        return;
    }

    println!("✓ Registered '{}' in bank '{}'", request.sound, request.bank);
    println!("  Bank id:     {}", report.bank_hex());
    println!("  Descriptor:  {}", report.descriptor.display());
    println!("  Instrument:  {}", report.instrument.position);
    println!(
        "  Duration:    {:.3}s ({} ticks)",
        report.duration_seconds, report.duration
    );
    if report.bank_slot.inserted {
        println!("  New bank:    channel {}", report.bank_slot.ordinal);
    }
}

/// Execute the add command
pub fn execute(args: AddArgs) -> Result<()> {
    let stdin = std::io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), std::io::stdout());
    let (decomp, request) = resolve(args, &mut prompter)?;
    tracing::debug!(
        "Registering {} into {}",
        request.sample.display(),
        decomp.root().display()
    );

    let report = register_sound(&decomp, &request, &AiffProbe).with_context(|| {
        format!(
            "Failed to register sound '{}' in bank '{}'",
            request.sound, request.bank
        )
    })?;
    print_report(&report, &request);
    Ok(())
}
