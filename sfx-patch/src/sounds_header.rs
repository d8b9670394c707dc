//! `include/sounds.h` editing: the `SoundBank` enum and the sound macros.
//!
//! ```c
//! enum SoundBank {
//!     SOUND_BANK_ACTION,
//!     SOUND_BANK_MOVING,
//!     SOUND_BANK_COUNT
//! };
//!
//! #define SOUND_ACTION_JUMP                                         SOUND_ARG_LOAD(SOUND_BANK_ACTION, 0x00, 0xFF, SOUND_DISCRETE)
//!
//! #endif
//! ```

use std::path::Path;

use crate::error::{Result, SfxError};
use crate::names::{Identifier, bank_enum_name, sound_macro_name};
use crate::text::TextDocument;

/// Opening line of the bank enumeration
pub const ENUM_OPEN: &str = "enum SoundBank {";

/// Sentinel entry that must stay last in the enumeration
pub const ENUM_SENTINEL: &str = "SOUND_BANK_COUNT";

/// Closing include guard; new banks get their first macro right above it
pub const GUARD_END: &str = "#endif";

/// Macro that packs bank, sound id, priority and flags
pub const SOUND_ARG_LOAD: &str = "SOUND_ARG_LOAD";

/// Column at which the macro value starts
pub const MACRO_VALUE_COLUMN: usize = 66;

/// Enum entries are indented with four spaces
const ENUM_INDENT: &str = "    ";

/// One real (non-sentinel) enum entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumEntry {
    pub line: usize,
    pub name: String,
    pub has_comma: bool,
}

/// A `#define NAME SOUND_ARG_LOAD(BANK, ID, ...)` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundMacro {
    pub line: usize,
    pub name: String,
    pub bank: String,
    pub sound_id: Option<u8>,
}

/// Structural view of sounds.h.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundsHeader {
    pub entries: Vec<EnumEntry>,
    pub sentinel: usize,
    pub macros: Vec<SoundMacro>,
    pub guard_end: usize,
}

/// Where a bank sits in the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankSlot {
    /// Zero-based position among real enum entries
    pub ordinal: usize,
    /// Whether the enum entry was added by this call
    pub inserted: bool,
}

impl BankSlot {
    /// Value passed to `chan_setbank` in the sound player.
    pub fn bank_select(&self) -> usize {
        self.ordinal + 1
    }
}

/// Strip a trailing `//` or `/* */` comment.
fn strip_comment(line: &str) -> &str {
    let end = [line.find("//"), line.find("/*")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(line.len());
    line[..end].trim()
}

fn parse_number(token: &str) -> Option<u32> {
    let token = token.trim();
    match token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => token.parse().ok(),
    }
}

fn parse_macro(line: usize, text: &str) -> Option<SoundMacro> {
    let rest = strip_comment(text).strip_prefix("#define")?;
    let mut parts = rest.split_whitespace();
    let name = parts.next()?.to_string();

    let value_start = rest.find(SOUND_ARG_LOAD)?;
    let args = &rest[value_start + SOUND_ARG_LOAD.len()..];
    let args = args.trim_start().strip_prefix('(')?;
    let args = &args[..args.find(')')?];
    let mut args = args.split(',');

    let bank = args.next()?.trim().to_string();
    let sound_id = args
        .next()
        .and_then(parse_number)
        .and_then(|id| u8::try_from(id).ok());

    Some(SoundMacro {
        line,
        name,
        bank,
        sound_id,
    })
}

impl SoundsHeader {
    /// Parse the enum block, the sound macros and the closing guard.
    pub fn parse(doc: &TextDocument, artifact: &Path) -> Result<Self> {
        let open = doc
            .lines()
            .iter()
            .position(|line| line.trim().starts_with(ENUM_OPEN))
            .ok_or_else(|| SfxError::missing_anchor(artifact, ENUM_OPEN))?;

        let mut entries = Vec::new();
        let mut sentinel = None;
        for (index, line) in doc.lines().iter().enumerate().skip(open + 1) {
            let code = strip_comment(line);
            if code.is_empty() {
                continue;
            }
            let name_end = code
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(code.len());
            let name = &code[..name_end];
            if name == ENUM_SENTINEL {
                sentinel = Some(index);
                break;
            }
            if name.is_empty() {
                // `};` before the sentinel
                break;
            }
            entries.push(EnumEntry {
                line: index,
                name: name.to_string(),
                has_comma: code.ends_with(','),
            });
        }
        let sentinel = sentinel.ok_or_else(|| SfxError::missing_anchor(artifact, ENUM_SENTINEL))?;

        let macros = doc
            .lines()
            .iter()
            .enumerate()
            .filter_map(|(index, line)| parse_macro(index, line))
            .collect();

        let guard_end = doc
            .lines()
            .iter()
            .rposition(|line| line.trim().starts_with(GUARD_END))
            .ok_or_else(|| SfxError::missing_anchor(artifact, GUARD_END))?;

        Ok(Self {
            entries,
            sentinel,
            macros,
            guard_end,
        })
    }

    pub fn ordinal_of(&self, enum_name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == enum_name)
    }

    pub fn has_macro(&self, macro_name: &str) -> bool {
        self.macros.iter().any(|m| m.name == macro_name)
    }

    pub fn macros_for<'a>(&'a self, enum_name: &'a str) -> impl Iterator<Item = &'a SoundMacro> {
        self.macros.iter().filter(move |m| m.bank == enum_name)
    }

    /// Sound id the next macro of this bank gets.
    pub fn next_sound_id(&self, enum_name: &str) -> Result<u8> {
        match self.macros_for(enum_name).filter_map(|m| m.sound_id).max() {
            None => Ok(0),
            Some(max) => max.checked_add(1).ok_or_else(|| SfxError::SoundIdSpaceExhausted {
                bank: enum_name.to_string(),
            }),
        }
    }
}

/// Make sure `SOUND_BANK_<BANK>` is declared; return its slot.
pub fn ensure_bank(doc: &mut TextDocument, artifact: &Path, bank: &Identifier) -> Result<BankSlot> {
    let header = SoundsHeader::parse(doc, artifact)?;
    let enum_name = bank_enum_name(bank);

    if let Some(ordinal) = header.ordinal_of(&enum_name) {
        tracing::info!("{} already exists in {}", enum_name, artifact.display());
        return Ok(BankSlot {
            ordinal,
            inserted: false,
        });
    }

    if let Some(last) = header.entries.last() {
        if !last.has_comma {
            let completed = complete_comma(doc.line(last.line));
            doc.replace(last.line, completed);
        }
    }
    doc.insert(header.sentinel, format!("{}{},", ENUM_INDENT, enum_name));
    tracing::info!("Added {} to {}", enum_name, artifact.display());

    Ok(BankSlot {
        ordinal: header.entries.len(),
        inserted: true,
    })
}

/// Append a comma after the entry name, keeping any trailing comment.
fn complete_comma(line: &str) -> String {
    let code_end = [line.find("//"), line.find("/*")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(line.len());
    let code = line[..code_end].trim_end();
    let comment = &line[code.len()..];
    format!("{},{}", code, comment)
}

/// `#define SOUND_<BANK>_<SOUND>` padded so the value starts at
/// [`MACRO_VALUE_COLUMN`].
pub fn format_sound_macro(bank: &Identifier, sound: &Identifier, channel_base: u8) -> String {
    let name = sound_macro_name(bank, sound);
    let prefix = format!("#define {}", name);
    let padding = MACRO_VALUE_COLUMN.saturating_sub(prefix.len()).max(1);
    format!(
        "{}{}{}({}, 0x{:02X}, 0xFF, SOUND_DISCRETE)",
        prefix,
        " ".repeat(padding),
        SOUND_ARG_LOAD,
        bank_enum_name(bank),
        channel_base
    )
}

/// Make sure `SOUND_<BANK>_<SOUND>` is defined. Returns the sound id of a
/// newly added macro, `None` if it was already there.
///
/// The id is one past the bank's highest, so an existing sound still
/// resolves when the bank has used up 0xFF.
pub fn ensure_macro(
    doc: &mut TextDocument,
    artifact: &Path,
    bank: &Identifier,
    sound: &Identifier,
) -> Result<Option<u8>> {
    let header = SoundsHeader::parse(doc, artifact)?;
    let macro_name = sound_macro_name(bank, sound);
    if header.has_macro(&macro_name) {
        tracing::info!("{} already exists in {}", macro_name, artifact.display());
        return Ok(None);
    }

    let enum_name = bank_enum_name(bank);
    let channel_base = header.next_sound_id(&enum_name)?;
    let index = header
        .macros_for(&enum_name)
        .map(|m| m.line + 1)
        .max()
        .unwrap_or(header.guard_end);
    doc.insert(index, format_sound_macro(bank, sound, channel_base));
    tracing::info!(
        "Added {} (sound id 0x{:02X}) to {}",
        macro_name,
        channel_base,
        artifact.display()
    );
    Ok(Some(channel_base))
}
