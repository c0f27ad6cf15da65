//! Interactive value collection.
//!
//! Sessions ask for values through the `Prompter` trait so the same
//! state machine runs against a terminal, piped input, or a script.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use crate::errors::{Result, SupassError};

/// Source of field values during account initialisation.
pub trait Prompter {
    /// Ask for a value that may be echoed.
    fn prompt_text(&mut self, prompt: &str) -> Result<String>;

    /// Ask for a value without echoing it.
    fn prompt_secret(&mut self, prompt: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Terminal
// ---------------------------------------------------------------------------

/// Prompts on the controlling terminal via `dialoguer`.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    /// dialoguer appends its own `: `, so drop a trailing one from the prompt.
    fn label(prompt: &str) -> &str {
        prompt.trim_end().trim_end_matches(':').trim_end()
    }
}

impl Prompter for TerminalPrompter {
    fn prompt_text(&mut self, prompt: &str) -> Result<String> {
        dialoguer::Input::<String>::new()
            .with_prompt(Self::label(prompt))
            .allow_empty(true)
            .interact_text()
            .map_err(|e| SupassError::PromptInterrupted(e.to_string()))
    }

    fn prompt_secret(&mut self, prompt: &str) -> Result<String> {
        dialoguer::Password::new()
            .with_prompt(Self::label(prompt))
            .allow_empty_password(true)
            .interact()
            .map_err(|e| SupassError::PromptInterrupted(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Line-oriented input
// ---------------------------------------------------------------------------

/// Reads one line per value, for piped or redirected input.
///
/// The prompt is written to `writer` unchanged; secrets are read the same
/// way as text because there is no terminal to suppress echo on.
pub struct LinePrompter<R, W> {
    reader: R,
    writer: W,
}

impl LinePrompter<io::StdinLock<'static>, io::Stderr> {
    /// Read from stdin, prompting on stderr so stdout stays clean.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    fn read_value(&mut self, prompt: &str) -> Result<String> {
        write!(self.writer, "{prompt}")
            .and_then(|()| self.writer.flush())
            .map_err(|e| SupassError::PromptInterrupted(e.to_string()))?;

        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .map_err(|e| SupassError::PromptInterrupted(e.to_string()))?;
        if read == 0 {
            return Err(SupassError::PromptInterrupted("end of input".into()));
        }

        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(line)
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn prompt_text(&mut self, prompt: &str) -> Result<String> {
        self.read_value(prompt)
    }

    fn prompt_secret(&mut self, prompt: &str) -> Result<String> {
        self.read_value(prompt)
    }
}

// ---------------------------------------------------------------------------
// Scripted
// ---------------------------------------------------------------------------

/// Answers prompts from a fixed list, recording what was asked.
///
/// Running out of answers behaves like a closed terminal.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    asked: Vec<(String, bool)>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// Prompts shown so far, each with `true` if it was a secret prompt.
    pub fn asked(&self) -> &[(String, bool)] {
        &self.asked
    }

    /// Answers not consumed yet.
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, prompt: &str, secret: bool) -> Result<String> {
        self.asked.push((prompt.to_string(), secret));
        self.answers
            .pop_front()
            .ok_or_else(|| SupassError::PromptInterrupted("no scripted answer left".into()))
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt_text(&mut self, prompt: &str) -> Result<String> {
        self.next(prompt, false)
    }

    fn prompt_secret(&mut self, prompt: &str) -> Result<String> {
        self.next(prompt, true)
    }
}
