//! End-to-end sound registration.
//!
//! [`register_sound`] threads the values derived from one artifact into the
//! next: the bank's hex id names the descriptor, the enum ordinal and the
//! instrument position feed the sound player, and the sample duration becomes
//! the layer note length.
//!
//! The artifacts are written one after another. Input validation happens
//! before any write, but a structural error in a later artifact (a missing
//! anchor, say) leaves the earlier ones already updated. Every step is
//! idempotent, so fixing the artifact and running the registration again
//! finishes the job.

use std::path::{Path, PathBuf};

use crate::bank_descriptor::{InstrumentSlot, ensure_instrument, ensure_sound_player_bank};
use crate::bank_ids::{allocate_free_hex_id, descriptor_path, find_descriptor, format_bank_id};
use crate::dispatch_switch::mirror_case_label;
use crate::duration::{DurationProbe, MAX_NOTE_TICKS, Ticks, duration_to_ticks};
use crate::error::{Result, SfxError};
use crate::layout::Decomp;
use crate::names::{Identifier, bank_enum_name};
use crate::sound_player::{
    SoundPlayerEdit, SoundPlayerEntry, check_sound_label, ensure_channel_and_sound,
};
use crate::sounds_header::{BankSlot, SoundsHeader, ensure_bank, ensure_macro};
use crate::text::{TextDocument, edit_document, read_text};

/// One "add this sample as a sound" request.
#[derive(Debug, Clone)]
pub struct SoundRegistration {
    pub sample: PathBuf,
    pub bank: Identifier,
    pub sound: Identifier,
}

/// Values derived during a registration and what each step changed.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationReport {
    pub bank_id: u8,
    pub descriptor: PathBuf,
    pub sample_destination: PathBuf,
    pub sample_copied: bool,
    pub bank_slot: BankSlot,
    /// Sound id of the macro added to sounds.h, if one was added
    pub sound_id: Option<u8>,
    pub instrument: InstrumentSlot,
    pub inclusion_added: bool,
    pub duration_seconds: f64,
    pub duration: Ticks,
    pub sound_player: SoundPlayerEdit,
    pub case_labels_added: usize,
}

impl RegistrationReport {
    /// Nothing in the project's sources changed: the sound was already
    /// registered.
    ///
    /// The sample copy is ignored; re-copying an updated sample over an
    /// existing registration is still a duplicate registration.
    pub fn is_duplicate(&self) -> bool {
        !self.bank_slot.inserted
            && self.sound_id.is_none()
            && !self.instrument.inserted
            && !self.inclusion_added
            && !self.sound_player.changed()
            && self.case_labels_added == 0
    }

    /// Bank identifier as written in the descriptor file name.
    pub fn bank_hex(&self) -> String {
        format_bank_id(self.bank_id)
    }
}

/// Copy the sample into the bank's sample directory.
///
/// Returns `false` when source and destination are the same file.
pub fn copy_sample(sample: &Path, destination: &Path) -> Result<bool> {
    if let (Ok(from), Ok(to)) = (sample.canonicalize(), destination.canonicalize()) {
        if from == to {
            tracing::debug!("{} is already in place", destination.display());
            return Ok(false);
        }
    }

    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SfxError::io(parent, e))?;
    }
    std::fs::copy(sample, destination).map_err(|e| SfxError::io(destination, e))?;
    tracing::info!("Copied {} to {}", sample.display(), destination.display());
    Ok(true)
}

/// The hex id a new bank would get right now.
pub fn next_bank_id(decomp: &Decomp) -> Result<u8> {
    allocate_free_hex_id(&decomp.sound_banks_dir())
}

/// Fail if `.sound_<sound>` is already used by a channel other than the
/// one `bank` has or would get.
fn check_label_free(decomp: &Decomp, bank: &Identifier, sound: &Identifier) -> Result<()> {
    let header_path = decomp.sounds_header();
    let header_doc = TextDocument::parse(&read_text(&header_path)?);
    let header = SoundsHeader::parse(&header_doc, &header_path)?;
    let ordinal = header
        .ordinal_of(&bank_enum_name(bank))
        .unwrap_or(header.entries.len());

    let player_path = decomp.sound_player();
    let player_doc = TextDocument::parse(&read_text(&player_path)?);
    check_sound_label(&player_doc, &player_path, ordinal, sound)
}

/// Register `request.sound` under `request.bank` across all four artifacts.
pub fn register_sound(
    decomp: &Decomp,
    request: &SoundRegistration,
    probe: &dyn DurationProbe,
) -> Result<RegistrationReport> {
    let SoundRegistration { sample, bank, sound } = request;
    decomp.check_sample(sample)?;

    // Probe before any write
    let duration_seconds = probe.probe(sample)?;
    let duration = duration_to_ticks(duration_seconds);
    if duration.0 > MAX_NOTE_TICKS {
        tracing::warn!(
            "{} is {:.2}s long ({} ticks); the layer note will overflow {:#x}",
            sample.display(),
            duration_seconds,
            duration,
            MAX_NOTE_TICKS
        );
    }

    let banks_dir = decomp.sound_banks_dir();
    let (bank_id, descriptor) = match find_descriptor(&banks_dir, bank)? {
        Some(found) => found,
        None => {
            let id = allocate_free_hex_id(&banks_dir)?;
            tracing::info!("Allocated bank id {} for '{}'", format_bank_id(id), bank);
            (id, descriptor_path(&banks_dir, id, bank))
        }
    };
    check_label_free(decomp, bank, sound)?;

    let sample_destination = decomp.sample_destination(bank, sound);
    let sample_copied = copy_sample(sample, &sample_destination)?;

    let header_path = decomp.sounds_header();
    let ((bank_slot, sound_id), _) = edit_document(&header_path, |doc| {
        let slot = ensure_bank(doc, &header_path, bank)?;
        let sound_id = ensure_macro(doc, &header_path, bank, sound)?;
        Ok((slot, sound_id))
    })?;

    let instrument = ensure_instrument(&descriptor, bank, sound)?;
    let stem = descriptor
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}_{}", format_bank_id(bank_id), bank));
    let inclusion_added = ensure_sound_player_bank(&decomp.sequences_json(), &stem)?;

    let player_path = decomp.sound_player();
    let entry = SoundPlayerEntry {
        ordinal: bank_slot.ordinal,
        bank,
        sound,
        instrument: instrument.position,
        duration,
    };
    let (sound_player, _) = edit_document(&player_path, |doc| {
        ensure_channel_and_sound(doc, &player_path, &entry)
    })?;

    let external_path = decomp.external_c();
    let (case_labels_added, _) = edit_document(&external_path, |doc| {
        mirror_case_label(doc, &external_path, bank)
    })?;

    let report = RegistrationReport {
        bank_id,
        descriptor,
        sample_destination,
        sample_copied,
        bank_slot,
        sound_id,
        instrument,
        inclusion_added,
        duration_seconds,
        duration,
        sound_player,
        case_labels_added,
    };

    if report.is_duplicate() {
        tracing::info!("Sound '{}' was already registered in bank '{}'", sound, bank);
    } else {
        tracing::info!(
            "Registered sound '{}' in bank '{}' ({}, instrument {}, {} ticks)",
            sound,
            bank,
            report.bank_hex(),
            instrument.position,
            duration
        );
    }
    Ok(report)
}
