//! `src/audio/external.c` case label mirroring.
//!
//! external.c switches over the sound bank in two places. Both switches have a
//! run of fall-through labels starting at `case SOUND_BANK_GENERAL:`; a new
//! bank joins that run in each of them.

use std::path::Path;

use crate::error::{Result, SfxError};
use crate::names::{Identifier, bank_enum_name};
use crate::text::{TextDocument, indentation};

/// Case label whose fall-through run new banks join
pub const ANCHOR_CASE: &str = "case SOUND_BANK_GENERAL:";

/// Number of switches expected to carry the anchor
pub const EXPECTED_ANCHORS: usize = 2;

/// Label of a `case X:` line, if the line is one.
fn case_label(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("case")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let label = rest[..rest.find(':')?].trim();
    Some(label)
}

/// Structural view of the case labels in a C source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRuns {
    /// For each anchor: index of the last case line in its contiguous run
    pub run_ends: Vec<usize>,
    pub labels: Vec<String>,
}

impl CaseRuns {
    pub fn parse(doc: &TextDocument) -> Self {
        let labels = doc
            .lines()
            .iter()
            .filter_map(|line| case_label(line))
            .map(str::to_string)
            .collect();

        let run_ends = doc
            .lines()
            .iter()
            .enumerate()
            .filter(|(_, line)| line.trim().starts_with(ANCHOR_CASE))
            .map(|(anchor, _)| {
                let mut end = anchor;
                while end + 1 < doc.len() && case_label(doc.line(end + 1)).is_some() {
                    end += 1;
                }
                end
            })
            .collect();

        Self { run_ends, labels }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// Add `case SOUND_BANK_<BANK>:` to every anchored switch.
///
/// Returns how many labels were inserted; zero means the bank was already
/// handled somewhere in the file.
pub fn mirror_case_label(doc: &mut TextDocument, artifact: &Path, bank: &Identifier) -> Result<usize> {
    let label = bank_enum_name(bank);
    let runs = CaseRuns::parse(doc);

    if runs.contains(&label) {
        tracing::info!("case {} already exists in {}", label, artifact.display());
        return Ok(0);
    }
    if runs.run_ends.is_empty() {
        return Err(SfxError::missing_anchor(artifact, ANCHOR_CASE));
    }
    if runs.run_ends.len() != EXPECTED_ANCHORS {
        tracing::warn!(
            "{}: found {} '{}' switches, expected {}",
            artifact.display(),
            runs.run_ends.len(),
            ANCHOR_CASE,
            EXPECTED_ANCHORS
        );
    }

    // Bottom-up so earlier indices stay valid
    for &end in runs.run_ends.iter().rev() {
        let indent = indentation(doc.line(end)).to_string();
        doc.insert(end + 1, format!("{}case {}:", indent, label));
    }

    tracing::info!(
        "Added case {} to {} switch(es) in {}",
        label,
        runs.run_ends.len(),
        artifact.display()
    );
    Ok(runs.run_ends.len())
}
