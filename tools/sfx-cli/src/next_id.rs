//! Next-id command - show which hex id a new bank would get

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use sfx_patch::bank_ids::format_bank_id;
use sfx_patch::{Decomp, next_bank_id};

use crate::prompt::expand_home;

/// Arguments for the next-id command
#[derive(Args)]
pub struct NextIdArgs {
    /// Path to the decomp checkout (defaults to current directory)
    #[arg(short, long)]
    pub decomp: Option<PathBuf>,
}

/// Execute the next-id command
pub fn execute(args: NextIdArgs) -> Result<()> {
    let root = match args.decomp {
        Some(path) => expand_home(&path.to_string_lossy()),
        None => std::env::current_dir()?,
    };
    let decomp = Decomp::open(root)?;
    println!("{}", format_bank_id(next_bank_id(&decomp)?));
    Ok(())
}
