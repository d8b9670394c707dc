//! Interactive prompting for missing command-line values.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use sfx_patch::Identifier;

/// Line-based question/answer over any reader and writer.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask once and return the trimmed answer.
    pub fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{}: ", question)?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read answer")?;
        if read == 0 {
            anyhow::bail!("Input closed while asking for: {}", question);
        }
        Ok(line.trim().to_string())
    }

    /// Ask for a path, expanding a leading `~`.
    pub fn ask_path(&mut self, question: &str) -> Result<PathBuf> {
        let answer = self.ask(question)?;
        Ok(expand_home(&answer))
    }

    /// Use `given` if it is a valid name, otherwise keep asking until one is.
    pub fn identifier(&mut self, given: Option<String>, question: &str) -> Result<Identifier> {
        let mut candidate = given;
        loop {
            let input = match candidate.take() {
                Some(input) => input,
                None => self.ask(question)?,
            };
            match Identifier::parse(&input) {
                Ok(name) => return Ok(name),
                Err(err) if err.is_retryable_input() => {
                    writeln!(self.output, "{}", err)?;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// Replace a leading `~` with the user's home directory.
pub fn expand_home(input: &str) -> PathBuf {
    let rest = match input.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '\\']) => rest,
        _ => return PathBuf::from(input),
    };

    match directories::BaseDirs::new() {
        Some(dirs) => dirs
            .home_dir()
            .join(rest.trim_start_matches(['/', '\\'])),
        None => PathBuf::from(input),
    }
}
