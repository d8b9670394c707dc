//! `sound/sequences/00_sound_player.s` editing.
//!
//! The sound player sequence starts one channel per bank and each channel
//! dispatches through a table of sounds:
//!
//! ```text
//! seq_initchannels 0x1fff
//! seq_startchannel 0, .channel0
//! ...
//! .channel0:
//! chan_setdyntable .channel0_table
//! ...
//! .channel0_table:
//! sound_ref .sound_action_jump
//!
//! .sound_action_jump:
//! chan_setbank 1
//! chan_setinstr 0
//! chan_setlayer 0, .layer_action_jump
//! chan_end
//!
//! .layer_action_jump:
//! layer_note1 39, 0x30, 127
//! layer_end
//!
//! .align 2, 0
//! ```
//!
//! Only the statements this editor inserts or looks for are recognized; the
//! rest of the script passes through untouched.

use std::path::Path;

use crate::duration::Ticks;
use crate::error::{Result, SfxError};
use crate::names::Identifier;
use crate::text::{TextDocument, indentation};

/// Channel mask every registered bank needs enabled
pub const INIT_CHANNELS: &str = "seq_initchannels 0x1fff";

const INIT_CHANNELS_DIRECTIVE: &str = "seq_initchannels";
const START_CHANNEL_DIRECTIVE: &str = "seq_startchannel";
const SOUND_REF: &str = "sound_ref";

/// Marker that must stay the last statement of the file
pub const ALIGN_MARKER: &str = ".align 2, 0";

/// Loop every new channel jumps back to after its setup
pub const MAIN_LOOP_LABEL: &str = ".main_loop_023589";

/// Note played by every sound layer
pub const LAYER_NOTE: u8 = 39;

/// Velocity of every sound layer
pub const LAYER_VELOCITY: u8 = 127;

/// `seq_startchannel <ordinal>, .<label>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartChannel {
    pub line: usize,
    pub ordinal: usize,
    /// Target label without the leading dot
    pub label: String,
}

/// Structural view of the sound player script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundPlayerScript {
    pub init_channels: Option<usize>,
    pub start_channels: Vec<StartChannel>,
    /// `(line, name)` of every `.name:` label
    pub labels: Vec<(usize, String)>,
    /// `(line, target)` of every `sound_ref .target`
    pub sound_refs: Vec<(usize, String)>,
    pub align_marker: Option<usize>,
}

/// Everything needed to add one sound to the sound player.
#[derive(Debug, Clone)]
pub struct SoundPlayerEntry<'a> {
    pub ordinal: usize,
    pub bank: &'a Identifier,
    pub sound: &'a Identifier,
    pub instrument: usize,
    pub duration: Ticks,
}

impl SoundPlayerEntry<'_> {
    fn sound_label(&self) -> String {
        format!("sound_{}", self.sound.lower())
    }

    fn layer_label(&self) -> String {
        format!("layer_{}", self.sound.lower())
    }

    /// `.sound_<s>` / `.layer_<s>` pair, starting with a blank line.
    fn sound_block(&self) -> Vec<String> {
        vec![
            String::new(),
            format!(".{}:", self.sound_label()),
            format!("chan_setbank {}", self.ordinal + 1),
            format!("chan_setinstr {}", self.instrument),
            format!("chan_setlayer 0, .{}", self.layer_label()),
            "chan_end".to_string(),
            String::new(),
            format!(".{}:", self.layer_label()),
            format!(
                "layer_note1 {}, {}, {}",
                LAYER_NOTE, self.duration, LAYER_VELOCITY
            ),
            "layer_end".to_string(),
        ]
    }

    /// Whole channel for a bank that has none yet.
    fn channel_block(&self) -> Vec<String> {
        let channel = format!("channel_{}", self.bank);
        let mut lines = vec![
            String::new(),
            format!(".{}:", channel),
            "chan_largenoteson".to_string(),
            "chan_setinstr 0".to_string(),
            "chan_setpanmix 127".to_string(),
            "chan_setnotepriority 14".to_string(),
            "chan_setval 0".to_string(),
            "chan_iowriteval 5".to_string(),
            "chan_stereoheadseteffects 1".to_string(),
            format!("chan_setdyntable .{}_table", channel),
            format!("chan_jump {}", MAIN_LOOP_LABEL),
            String::new(),
            format!(".{}_table:", channel),
            format!("{} .{}", SOUND_REF, self.sound_label()),
        ];
        lines.extend(self.sound_block());
        lines.push(String::new());
        lines
    }
}

/// What [`ensure_channel_and_sound`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoundPlayerEdit {
    pub init_normalized: bool,
    pub channel_added: bool,
    pub sound_added: bool,
}

impl SoundPlayerEdit {
    pub fn changed(&self) -> bool {
        self.init_normalized || self.channel_added || self.sound_added
    }
}

fn parse_number(token: &str) -> Option<usize> {
    let token = token.trim();
    match token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => token.parse().ok(),
    }
}

/// Split `directive args` into its arguments, if the line is that directive.
fn directive_args<'a>(line: &'a str, directive: &str) -> Option<&'a str> {
    let rest = line.trim().strip_prefix(directive)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

fn parse_start_channel(line: usize, text: &str) -> Option<StartChannel> {
    let args = directive_args(text, START_CHANNEL_DIRECTIVE)?;
    let (ordinal, label) = args.split_once(',')?;
    Some(StartChannel {
        line,
        ordinal: parse_number(ordinal)?,
        label: label.trim().trim_start_matches('.').to_string(),
    })
}

impl SoundPlayerScript {
    pub fn parse(doc: &TextDocument) -> Self {
        let mut script = Self {
            init_channels: None,
            start_channels: Vec::new(),
            labels: Vec::new(),
            sound_refs: Vec::new(),
            align_marker: None,
        };

        for (index, line) in doc.lines().iter().enumerate() {
            let trimmed = line.trim();
            if directive_args(trimmed, INIT_CHANNELS_DIRECTIVE).is_some() {
                script.init_channels.get_or_insert(index);
            } else if let Some(start) = parse_start_channel(index, trimmed) {
                script.start_channels.push(start);
            } else if let Some(target) = directive_args(trimmed, SOUND_REF) {
                script
                    .sound_refs
                    .push((index, target.trim_start_matches('.').to_string()));
            } else if trimmed == ALIGN_MARKER {
                script.align_marker = Some(index);
            } else if let Some(name) = trimmed
                .strip_prefix('.')
                .and_then(|rest| rest.strip_suffix(':'))
            {
                script.labels.push((index, name.to_string()));
            }
        }

        script
    }

    pub fn channel(&self, ordinal: usize) -> Option<&StartChannel> {
        self.start_channels.iter().find(|c| c.ordinal == ordinal)
    }

    pub fn label_line(&self, name: &str) -> Option<usize> {
        self.labels
            .iter()
            .find(|(_, label)| label == name)
            .map(|(line, _)| *line)
    }

    /// Whether some table already dispatches to `.sound_label`.
    pub fn has_sound_ref(&self, sound_label: &str) -> bool {
        self.sound_refs.iter().any(|(_, target)| target == sound_label)
    }

    /// Last line of the contiguous `sound_ref` run following `table_line`.
    ///
    /// Blank lines between the label and the first reference are skipped.
    /// Returns `None` for a table with no references.
    pub fn table_run_end(&self, doc: &TextDocument, table_line: usize) -> Option<usize> {
        let mut last = None;
        for index in table_line + 1..doc.len() {
            let line = doc.line(index);
            if directive_args(line, SOUND_REF).is_some() {
                last = Some(index);
            } else if last.is_some() || !line.trim().is_empty() {
                break;
            }
        }
        last
    }

    /// First and last line of channel `ordinal`'s table, if it has references.
    pub fn table_span(&self, doc: &TextDocument, ordinal: usize) -> Option<(usize, usize)> {
        let channel = self.channel(ordinal)?;
        let table_line = self.label_line(&format!("{}_table", channel.label))?;
        Some((table_line, self.table_run_end(doc, table_line)?))
    }
}

/// Fail if `.sound_<sound>` is referenced anywhere but channel `ordinal`'s
/// own table.
///
/// A reference inside that table means the sound is already registered; one
/// elsewhere belongs to another bank and a second label would not assemble.
pub fn check_sound_label(
    doc: &TextDocument,
    artifact: &Path,
    ordinal: usize,
    sound: &Identifier,
) -> Result<()> {
    let script = SoundPlayerScript::parse(doc);
    let label = format!("sound_{}", sound.lower());
    let own = script.table_span(doc, ordinal);
    let foreign = script.sound_refs.iter().any(|(line, target)| {
        *target == label && !own.is_some_and(|(start, end)| (start..=end).contains(line))
    });
    if foreign {
        return Err(SfxError::SoundLabelConflict {
            artifact: artifact.to_path_buf(),
            label: format!(".{}", label),
        });
    }
    Ok(())
}

/// Add a sound (and if needed its bank's channel) to the sound player.
pub fn ensure_channel_and_sound(
    doc: &mut TextDocument,
    artifact: &Path,
    entry: &SoundPlayerEntry<'_>,
) -> Result<SoundPlayerEdit> {
    let mut edit = SoundPlayerEdit::default();
    check_sound_label(doc, artifact, entry.ordinal, entry.sound)?;
    let script = SoundPlayerScript::parse(doc);

    let init = script
        .init_channels
        .ok_or_else(|| SfxError::missing_anchor(artifact, INIT_CHANNELS_DIRECTIVE))?;
    if doc.line(init).trim() != INIT_CHANNELS {
        let normalized = format!("{}{}", indentation(doc.line(init)), INIT_CHANNELS);
        doc.replace(init, normalized);
        edit.init_normalized = true;
        tracing::info!("Normalized {} in {}", INIT_CHANNELS, artifact.display());
    }

    let last_start = script
        .start_channels
        .last()
        .ok_or_else(|| SfxError::missing_anchor(artifact, START_CHANNEL_DIRECTIVE))?;
    let sound_label = entry.sound_label();

    match script.channel(entry.ordinal) {
        Some(channel) => {
            let table = format!("{}_table", channel.label);
            let table_line = script
                .label_line(&table)
                .ok_or_else(|| SfxError::missing_anchor(artifact, format!(".{}:", table)))?;

            // Only this channel's own table can hold it at this point
            if script.has_sound_ref(&sound_label) {
                tracing::info!(
                    "Sound '{}' already exists in {}",
                    entry.sound,
                    artifact.display()
                );
                return Ok(edit);
            }

            let (index, indent) = match script.table_run_end(doc, table_line) {
                Some(end) => (end + 1, indentation(doc.line(end)).to_string()),
                None => (table_line + 1, String::new()),
            };
            doc.insert(index, format!("{}{} .{}", indent, SOUND_REF, sound_label));
            doc.insert_all(index + 1, entry.sound_block());
            edit.sound_added = true;
            tracing::info!(
                "Sound '{}' added to channel .{}",
                entry.sound,
                channel.label
            );
        }
        None => {
            let align = script
                .align_marker
                .ok_or_else(|| SfxError::missing_anchor(artifact, ALIGN_MARKER))?;

            // The block goes below the start line, so insert it first
            doc.insert_all(align, entry.channel_block());
            let indent = indentation(doc.line(last_start.line)).to_string();
            doc.insert(
                last_start.line + 1,
                format!(
                    "{}{} {}, .channel_{}",
                    indent, START_CHANNEL_DIRECTIVE, entry.ordinal, entry.bank
                ),
            );
            edit.channel_added = true;
            edit.sound_added = true;
            tracing::info!(
                "Sound bank '{}' created as channel {}",
                entry.bank,
                entry.ordinal
            );
        }
    }

    Ok(edit)
}
