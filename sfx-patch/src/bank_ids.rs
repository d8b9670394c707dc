//! Sound bank identifier allocation.
//!
//! Bank descriptors are named `<hex>_<bank>.json` (or just `<hex>.json` for
//! the vanilla banks). The two-digit hex prefix is the bank's identifier and
//! is never stored anywhere else, so the set of used identifiers is derived
//! from the directory listing every time.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Result, SfxError};
use crate::names::Identifier;

/// Number of distinct bank identifiers (00-FF)
pub const BANK_ID_COUNT: usize = 256;

/// Parse the identifier prefix of a descriptor file stem (`0A_jungle` -> 0x0A).
pub fn parse_bank_id(stem: &str) -> Option<u8> {
    let prefix = stem.split('_').next()?;
    if prefix.len() != 2 || !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(prefix, 16).ok()
}

/// Format an identifier the way descriptor file names spell it.
pub fn format_bank_id(id: u8) -> String {
    format!("{:02X}", id)
}

/// All descriptor files below `dir` (recursive), sorted for stable output.
fn descriptor_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            SfxError::io(path, e.into())
        })?;
        let is_json = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext == "json")
            .unwrap_or(false);
        if entry.file_type().is_file() && is_json {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Identifiers already taken by descriptor files in `dir`.
pub fn used_bank_ids(dir: &Path) -> Result<BTreeSet<u8>> {
    Ok(descriptor_files(dir)?
        .iter()
        .filter_map(|path| path.file_stem().and_then(|s| s.to_str()))
        .filter_map(parse_bank_id)
        .collect())
}

/// Lowest identifier not in `used`.
pub fn lowest_free_id(used: &BTreeSet<u8>) -> Result<u8> {
    (0..=u8::MAX)
        .find(|id| !used.contains(id))
        .ok_or(SfxError::IdentifierSpaceExhausted)
}

/// Return the smallest unused bank identifier in `dir`.
///
/// Fails with [`SfxError::IdentifierSpaceExhausted`] when all 256 are taken.
pub fn allocate_free_hex_id(dir: &Path) -> Result<u8> {
    let used = used_bank_ids(dir)?;
    let id = lowest_free_id(&used)?;
    tracing::debug!(
        "Allocated bank id {} ({} of {} in use)",
        format_bank_id(id),
        used.len(),
        BANK_ID_COUNT
    );
    Ok(id)
}

/// Find the descriptor already registered for `bank`, if any.
///
/// Matches the whole `<bank>` part of `<hex>_<bank>.json`, ignoring ASCII
/// case like every other artifact does: `05_JUNGLE.json` is `jungle`'s
/// descriptor, `05_jungle2.json` is not.
pub fn find_descriptor(dir: &Path, bank: &Identifier) -> Result<Option<(u8, PathBuf)>> {
    for path in descriptor_files(dir)? {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some((_, name)) = stem.split_once('_') else {
            continue;
        };
        if !name.eq_ignore_ascii_case(bank.as_str()) {
            continue;
        }
        if let Some(id) = parse_bank_id(stem) {
            return Ok(Some((id, path)));
        }
    }
    Ok(None)
}

/// Path of a new descriptor for `bank` with identifier `id`.
pub fn descriptor_path(dir: &Path, id: u8, bank: &Identifier) -> PathBuf {
    dir.join(format!("{}_{}.json", format_bank_id(id), bank))
}
