//! Line-oriented text documents and whole-file read/modify/write.
//!
//! Every text artifact (sounds.h, the sound player script, external.c) is
//! edited through [`TextDocument`]: the file is split into lines, the editor
//! inserts or replaces whole lines at structural positions, and the result is
//! rendered back with the original line ending style.

use std::path::Path;

use crate::error::{Result, SfxError};

/// Maximum size of a sample file read into memory for probing.
pub const MAX_SAMPLE_BYTES: u64 = 64 * 1024 * 1024; // 64 MiB

/// A text file held as individual lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    lines: Vec<String>,
    newline: &'static str,
    trailing_newline: bool,
}

impl TextDocument {
    /// Split text into lines, remembering CRLF vs LF and the final newline.
    pub fn parse(text: &str) -> Self {
        let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };
        Self {
            lines: text.lines().map(str::to_string).collect(),
            newline,
            trailing_newline: text.ends_with('\n'),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// Indices come from the structural parsers, so out of range is a bug.
    pub(crate) fn line(&self, index: usize) -> &str {
        &self.lines[index]
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub(crate) fn insert(&mut self, index: usize, line: impl Into<String>) {
        self.lines.insert(index, line.into());
    }

    /// Insert a block of lines so that the first one lands at `index`.
    pub(crate) fn insert_all<I, S>(&mut self, index: usize, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines
            .splice(index..index, lines.into_iter().map(Into::into));
    }

    pub(crate) fn replace(&mut self, index: usize, line: impl Into<String>) {
        self.lines[index] = line.into();
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join(self.newline);
        if self.trailing_newline {
            out.push_str(self.newline);
        }
        out
    }
}

/// Leading whitespace of a line, used to indent inserted siblings.
pub fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| SfxError::io(path, e))
}

/// Write `content` unless the file already holds exactly that text.
///
/// Returns `true` when the file was written.
pub fn write_if_changed(path: &Path, original: &str, content: &str) -> Result<bool> {
    if original == content {
        return Ok(false);
    }
    std::fs::write(path, content).map_err(|e| SfxError::io(path, e))?;
    Ok(true)
}

/// Read a text artifact, let `edit` mutate it, and write it back if it changed.
///
/// Nothing is written when `edit` fails, so a missing anchor never leaves a
/// half-edited file behind.
pub fn edit_document<T>(
    path: &Path,
    edit: impl FnOnce(&mut TextDocument) -> Result<T>,
) -> Result<(T, bool)> {
    let original = read_text(path)?;
    let mut doc = TextDocument::parse(&original);
    let value = edit(&mut doc)?;
    let written = write_if_changed(path, &original, &doc.render())?;
    if written {
        tracing::debug!("Updated {}", path.display());
    }
    Ok((value, written))
}

/// Read a file into memory with a size cap.
pub fn read_file_with_limit(path: &Path, max_bytes: u64) -> Result<Vec<u8>> {
    let metadata = std::fs::metadata(path).map_err(|e| SfxError::io(path, e))?;
    let len = metadata.len();
    if len > max_bytes {
        return Err(SfxError::InvalidSampleFile {
            path: path.to_path_buf(),
            reason: format!("file too large ({} bytes, max {} bytes)", len, max_bytes),
        });
    }
    std::fs::read(path).map_err(|e| SfxError::io(path, e))
}
