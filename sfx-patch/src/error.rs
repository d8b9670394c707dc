//! Error types for sound registration

use std::path::PathBuf;

/// Everything that can stop a registration.
///
/// Duplicates are not represented here: re-adding a bank, macro, instrument,
/// sound reference or case label is reported through the edit outcomes and
/// treated as success.
#[derive(Debug, thiserror::Error)]
pub enum SfxError {
    #[error("Invalid decomp directory: {} (expected to find {marker})", .path.display())]
    InvalidWorkingDirectory { path: PathBuf, marker: &'static str },

    #[error("Invalid sound file {}: {reason}", .path.display())]
    InvalidSampleFile { path: PathBuf, reason: String },

    #[error("Invalid name '{input}': use alphanumeric characters and underscores only")]
    InvalidIdentifier { input: String },

    #[error("{}: expected to find '{anchor}'", .artifact.display())]
    MissingAnchor { artifact: PathBuf, anchor: String },

    #[error("All 256 sound bank identifiers (00-FF) are already in use")]
    IdentifierSpaceExhausted,

    #[error("Bank {bank} already uses sound id 0xFF; no sound ids left")]
    SoundIdSpaceExhausted { bank: String },

    #[error("{}: label '{label}' already belongs to another channel", .artifact.display())]
    SoundLabelConflict { artifact: PathBuf, label: String },

    #[error("Malformed bank descriptor {}: {reason}", .path.display())]
    InvalidDescriptor { path: PathBuf, reason: String },

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl SfxError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SfxError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn missing_anchor(artifact: impl Into<PathBuf>, anchor: impl Into<String>) -> Self {
        SfxError::MissingAnchor {
            artifact: artifact.into(),
            anchor: anchor.into(),
        }
    }

    /// Whether the CLI should ask again instead of giving up.
    pub fn is_retryable_input(&self) -> bool {
        matches!(self, SfxError::InvalidIdentifier { .. })
    }
}

pub type Result<T> = std::result::Result<T, SfxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            SfxError::IdentifierSpaceExhausted.to_string(),
            "All 256 sound bank identifiers (00-FF) are already in use"
        );
        assert_eq!(
            SfxError::missing_anchor("include/sounds.h", "SOUND_BANK_COUNT").to_string(),
            "include/sounds.h: expected to find 'SOUND_BANK_COUNT'"
        );
        assert_eq!(
            SfxError::InvalidIdentifier {
                input: "a-b".to_string()
            }
            .to_string(),
            "Invalid name 'a-b': use alphanumeric characters and underscores only"
        );
    }

    #[test]
    fn test_only_identifier_errors_are_retryable() {
        assert!(
            SfxError::InvalidIdentifier {
                input: String::new()
            }
            .is_retryable_input()
        );
        assert!(!SfxError::IdentifierSpaceExhausted.is_retryable_input());
    }
}
