//! Decomp project layout.
//!
//! A [`Decomp`] is built once from a validated root directory and passed to
//! every operation. Artifact locations default to the standard decomp tree and
//! can be overridden with an optional `sfx.toml` in the project root:
//!
//! ```toml
//! sounds_header = "include/sounds.h"
//! sound_banks = "sound/sound_banks"
//! sequences_json = "sound/sequences.json"
//! sound_player = "sound/sequences/00_sound_player.s"
//! external_c = "src/audio/external.c"
//! samples = "sound/samples"
//! sample_extension = "aiff"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Result, SfxError};
use crate::names::{Identifier, sample_bank_name};

/// File that marks a directory as a decomp checkout.
pub const MARKER_FILE: &str = "sm64.ld";

/// Optional per-project configuration file.
pub const CONFIG_FILE: &str = "sfx.toml";

/// Artifact locations relative to the decomp root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub sounds_header: PathBuf,
    pub sound_banks: PathBuf,
    pub sequences_json: PathBuf,
    pub sound_player: PathBuf,
    pub external_c: PathBuf,
    pub samples: PathBuf,
    /// Required sample extension, without the dot
    pub sample_extension: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            sounds_header: PathBuf::from("include/sounds.h"),
            sound_banks: PathBuf::from("sound/sound_banks"),
            sequences_json: PathBuf::from("sound/sequences.json"),
            sound_player: PathBuf::from("sound/sequences/00_sound_player.s"),
            external_c: PathBuf::from("src/audio/external.c"),
            samples: PathBuf::from("sound/samples"),
            sample_extension: "aiff".to_string(),
        }
    }
}

impl LayoutConfig {
    /// Parse config from TOML text
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| SfxError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// A validated decomp checkout.
#[derive(Debug, Clone)]
pub struct Decomp {
    root: PathBuf,
    config: LayoutConfig,
}

impl Decomp {
    /// Validate `root` (it must contain [`MARKER_FILE`]) and load `sfx.toml`
    /// if present.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() || !root.join(MARKER_FILE).is_file() {
            return Err(SfxError::InvalidWorkingDirectory {
                path: root,
                marker: MARKER_FILE,
            });
        }

        let config_path = root.join(CONFIG_FILE);
        let config = if config_path.is_file() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| SfxError::io(&config_path, e))?;
            tracing::debug!("Using layout from {}", config_path.display());
            LayoutConfig::parse(&content, &config_path)?
        } else {
            LayoutConfig::default()
        };

        Ok(Self { root, config })
    }

    /// Use an explicit layout, still requiring the marker file.
    pub fn with_config(root: impl Into<PathBuf>, config: LayoutConfig) -> Result<Self> {
        let mut decomp = Self::open(root)?;
        decomp.config = config;
        Ok(decomp)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn sounds_header(&self) -> PathBuf {
        self.root.join(&self.config.sounds_header)
    }

    pub fn sound_banks_dir(&self) -> PathBuf {
        self.root.join(&self.config.sound_banks)
    }

    pub fn sequences_json(&self) -> PathBuf {
        self.root.join(&self.config.sequences_json)
    }

    pub fn sound_player(&self) -> PathBuf {
        self.root.join(&self.config.sound_player)
    }

    pub fn external_c(&self) -> PathBuf {
        self.root.join(&self.config.external_c)
    }

    /// Where a sample for `sound` in `bank` gets copied to.
    ///
    /// The file name is lowercase to match the instrument's `sound` field.
    pub fn sample_destination(&self, bank: &Identifier, sound: &Identifier) -> PathBuf {
        self.root
            .join(&self.config.samples)
            .join(sample_bank_name(bank))
            .join(format!("{}.{}", sound.lower(), self.config.sample_extension))
    }

    /// Check that a sample exists and has the configured extension.
    pub fn check_sample(&self, sample: &Path) -> Result<()> {
        if !sample.is_file() {
            return Err(SfxError::InvalidSampleFile {
                path: sample.to_path_buf(),
                reason: "file does not exist".to_string(),
            });
        }

        let extension_ok = sample
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(&self.config.sample_extension))
            .unwrap_or(false);
        if !extension_ok {
            return Err(SfxError::InvalidSampleFile {
                path: sample.to_path_buf(),
                reason: format!("supported type: .{}", self.config.sample_extension),
            });
        }

        Ok(())
    }
}
