//! Bank and sound names as typed in by the user.

use std::fmt;

use crate::error::{Result, SfxError};

/// A bank or sound name: ASCII letters, digits and underscores.
///
/// The raw spelling ends up in the descriptor file name (`0B_Jungle.json`)
/// and the channel label; the upper and lower case forms feed the C
/// identifiers, sample names and sequence labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Normalize user input: spaces become underscores, then validate.
    pub fn parse(input: &str) -> Result<Self> {
        let value = input.trim().replace(' ', "_");
        let valid = value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && value.chars().any(|c| c.is_ascii_alphanumeric());
        if !valid {
            return Err(SfxError::InvalidIdentifier {
                input: input.to_string(),
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn upper(&self) -> String {
        self.0.to_ascii_uppercase()
    }

    pub fn lower(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `SOUND_BANK_<BANK>` - the enum entry, also used as the switch case label.
pub fn bank_enum_name(bank: &Identifier) -> String {
    format!("SOUND_BANK_{}", bank.upper())
}

/// `SOUND_<BANK>_<SOUND>` - the macro a game uses to play the sound.
pub fn sound_macro_name(bank: &Identifier, sound: &Identifier) -> String {
    format!("SOUND_{}_{}", bank.upper(), sound.upper())
}

/// `inst_<sound>` - key in the bank descriptor.
pub fn instrument_key(sound: &Identifier) -> String {
    format!("inst_{}", sound.lower())
}

/// `sfx_<bank>` - sample directory and `sample_bank` value.
pub fn sample_bank_name(bank: &Identifier) -> String {
    format!("sfx_{}", bank.lower())
}
