//! Bank descriptors (`sound/sound_banks/<hex>_<bank>.json`) and the sound
//! player's bank list in `sound/sequences.json`.
//!
//! Existing files are edited as ordered JSON values so keys this tool does not
//! know about (tuning, note ranges, extra envelopes) survive untouched.

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{Result, SfxError};
use crate::names::{Identifier, instrument_key, sample_bank_name};

/// Date stamped into newly created descriptors
pub const DEFAULT_DATE: &str = "1996-03-19";

/// Envelope every new instrument uses
pub const DEFAULT_ENVELOPE: &str = "envelope0";

/// Release rate of new instruments
pub const DEFAULT_RELEASE_RATE: u32 = 208;

/// Key in sequences.json listing the banks the sound player loads
pub const SOUND_PLAYER_KEY: &str = "00_sound_player";

/// One instrument entry in a bank descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instrument {
    pub release_rate: u32,
    pub envelope: String,
    pub sound: String,
}

impl Instrument {
    pub fn for_sound(sound: &Identifier) -> Self {
        Self {
            release_rate: DEFAULT_RELEASE_RATE,
            envelope: DEFAULT_ENVELOPE.to_string(),
            sound: sound.lower(),
        }
    }
}

/// A freshly created bank descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct BankDescriptor {
    pub date: String,
    pub sample_bank: String,
    pub envelopes: Map<String, Value>,
    pub instruments: Map<String, Value>,
    pub instrument_list: Vec<Option<String>>,
}

impl BankDescriptor {
    /// Descriptor holding a single instrument for `sound`.
    pub fn new(bank: &Identifier, sound: &Identifier) -> Self {
        let mut envelopes = Map::new();
        envelopes.insert(
            DEFAULT_ENVELOPE.to_string(),
            serde_json::json!([[1, 32700], "hang"]),
        );

        let key = instrument_key(sound);
        let mut instruments = Map::new();
        instruments.insert(key.clone(), instrument_value(sound));

        Self {
            date: DEFAULT_DATE.to_string(),
            sample_bank: sample_bank_name(bank),
            envelopes,
            instruments,
            instrument_list: vec![Some(key)],
        }
    }
}

fn instrument_value(sound: &Identifier) -> Value {
    serde_json::json!(Instrument::for_sound(sound))
}

/// Result of [`ensure_instrument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentSlot {
    /// Index into `instrument_list`, used by `chan_setinstr`
    pub position: usize,
    /// The descriptor file did not exist before
    pub created: bool,
    /// The instrument was added by this call
    pub inserted: bool,
}

/// Serialize with the given indent and a trailing newline.
pub fn to_pretty_json<T: Serialize>(value: &T, indent: &[u8]) -> serde_json::Result<String> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    let mut text = String::from_utf8_lossy(&out).into_owned();
    text.push('\n');
    Ok(text)
}

fn read_json(path: &Path) -> Result<(String, Value)> {
    let text = std::fs::read_to_string(path).map_err(|e| SfxError::io(path, e))?;
    let value = serde_json::from_str(&text).map_err(|source| SfxError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((text, value))
}

fn render_json<T: Serialize>(path: &Path, value: &T, indent: &[u8]) -> Result<String> {
    to_pretty_json(value, indent).map_err(|source| SfxError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json(path: &Path, original: &str, value: &Value, indent: &[u8]) -> Result<bool> {
    crate::text::write_if_changed(path, original, &render_json(path, value, indent)?)
}

fn invalid(path: &Path, reason: impl Into<String>) -> SfxError {
    SfxError::InvalidDescriptor {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Create the bank descriptor or add `sound` to it; return its position.
///
/// An instrument that is already present keeps its position.
pub fn ensure_instrument(path: &Path, bank: &Identifier, sound: &Identifier) -> Result<InstrumentSlot> {
    let key = instrument_key(sound);

    if !path.exists() {
        let descriptor = render_json(path, &BankDescriptor::new(bank, sound), b"  ")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SfxError::io(parent, e))?;
        }
        std::fs::write(path, descriptor).map_err(|e| SfxError::io(path, e))?;
        tracing::info!("Created bank descriptor {}", path.display());
        return Ok(InstrumentSlot {
            position: 0,
            created: true,
            inserted: true,
        });
    }

    let (original, mut root) = read_json(path)?;
    let object = root
        .as_object_mut()
        .ok_or_else(|| invalid(path, "top level is not an object"))?;

    let already_present = object
        .get("instruments")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid(path, "missing \"instruments\" object"))?
        .contains_key(&key);
    let list = object
        .get("instrument_list")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid(path, "missing \"instrument_list\" array"))?;
    let listed = list.iter().position(|entry| entry.as_str() == Some(key.as_str()));

    if already_present {
        let position = listed
            .ok_or_else(|| invalid(path, format!("{} is not in instrument_list", key)))?;
        tracing::info!("Sound '{}' already exists in bank '{}'", sound, bank);
        return Ok(InstrumentSlot {
            position,
            created: false,
            inserted: false,
        });
    }
    if listed.is_some() {
        return Err(invalid(
            path,
            format!("{} is listed but has no instrument entry", key),
        ));
    }

    if let Some(instruments) = object.get_mut("instruments").and_then(Value::as_object_mut) {
        instruments.insert(key.clone(), instrument_value(sound));
    }
    let mut position = 0;
    if let Some(list) = object.get_mut("instrument_list").and_then(Value::as_array_mut) {
        list.push(Value::String(key));
        position = list.len() - 1;
    }

    write_json(path, &original, &root, b"  ")?;
    tracing::info!("Sound '{}' added to bank '{}' at position {}", sound, bank, position);
    Ok(InstrumentSlot {
        position,
        created: false,
        inserted: true,
    })
}

/// Make sure the sound player loads the bank whose descriptor stem is `stem`.
///
/// Membership is an exact match on the stem inside the `00_sound_player`
/// list; other sections of sequences.json are not consulted. Returns `true`
/// if the stem was appended.
pub fn ensure_sound_player_bank(path: &Path, stem: &str) -> Result<bool> {
    let (original, mut root) = read_json(path)?;
    let list = root
        .get_mut(SOUND_PLAYER_KEY)
        .and_then(Value::as_array_mut)
        .ok_or_else(|| SfxError::missing_anchor(path, SOUND_PLAYER_KEY))?;

    if list.iter().any(|entry| entry.as_str() == Some(stem)) {
        tracing::debug!("{} already loads {}", SOUND_PLAYER_KEY, stem);
        return Ok(false);
    }

    list.push(Value::String(stem.to_string()));
    write_json(path, &original, &root, b"    ")?;
    tracing::info!("Added {} to {} in {}", stem, SOUND_PLAYER_KEY, path.display());
    Ok(true)
}
