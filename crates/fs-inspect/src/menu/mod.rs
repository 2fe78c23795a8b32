//! Option-letter menus shared by the per-type sessions.
//!
//! A session prints its prompt, reads one token from a [`CommandSource`]
//! and dispatches each recognised letter, left to right. `-` and space
//! are always allowed and act as separators.

pub mod source;

use std::io::Write;

use tracing::debug;

pub use source::{CommandSource, ReaderSource, ScriptedSource};

use crate::config::{MenuMode, ValidationPolicy};
use crate::error::Result;

const SEPARATORS: [char; 2] = ['-', ' '];

/// Whether dispatch continues with the next letter of the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenVerdict {
    Valid,
    Invalid { offending: Vec<char> },
}

/// Check every character of `token` against `letters` plus the separators.
pub fn validate(token: &str, letters: &str) -> TokenVerdict {
    let offending: Vec<char> = token
        .chars()
        .filter(|c| !SEPARATORS.contains(c) && !letters.contains(*c))
        .collect();
    if offending.is_empty() {
        TokenVerdict::Valid
    } else {
        TokenVerdict::Invalid { offending }
    }
}

/// Letters of `token` that will be dispatched, in order.
pub fn actionable_letters(token: &str, letters: &str, policy: ValidationPolicy) -> Vec<char> {
    if !token.starts_with('-') {
        return Vec::new();
    }
    if policy == ValidationPolicy::WholeToken && validate(token, letters) != TokenVerdict::Valid {
        return Vec::new();
    }
    token
        .chars()
        .filter(|c| !SEPARATORS.contains(c) && letters.contains(*c))
        .collect()
}

/// Result of one menu interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuOutcome {
    /// The last token read, if any input was available.
    pub token: Option<String>,
    /// Letters whose actions ran, in order.
    pub dispatched: Vec<char>,
    /// Whether the last token failed validation.
    pub rejected: bool,
}

pub struct OptionMenu<'a> {
    prompt: &'a str,
    letters: &'a str,
    policy: ValidationPolicy,
    mode: MenuMode,
}

impl<'a> OptionMenu<'a> {
    pub fn new(prompt: &'a str, letters: &'a str) -> Self {
        Self {
            prompt,
            letters,
            policy: ValidationPolicy::default(),
            mode: MenuMode::default(),
        }
    }

    pub fn policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn mode(mut self, mode: MenuMode) -> Self {
        self.mode = mode;
        self
    }

    /// Prompt, read a token and dispatch its letters.
    ///
    /// `dispatch` receives the source too so that an action can read a
    /// follow-up token (a link name, for instance).
    pub fn run<F>(
        &self,
        source: &mut dyn CommandSource,
        out: &mut dyn Write,
        mut dispatch: F,
    ) -> Result<MenuOutcome>
    where
        F: FnMut(char, &mut dyn CommandSource, &mut dyn Write) -> Result<Flow>,
    {
        let mut outcome = MenuOutcome::default();
        loop {
            write!(out, "{}", self.prompt).map_err(write_error)?;
            out.flush().map_err(write_error)?;

            let Some(token) = source.next_token() else {
                debug!("menu input exhausted");
                writeln!(out).map_err(write_error)?;
                return Ok(outcome);
            };

            outcome.rejected = false;
            if let TokenVerdict::Invalid { offending } = validate(&token, self.letters) {
                debug!(token = %token, ?offending, "option token rejected");
                writeln!(out, "Invalid option").map_err(write_error)?;
                outcome.rejected = true;
            }

            for letter in actionable_letters(&token, self.letters, self.policy) {
                outcome.dispatched.push(letter);
                if dispatch(letter, source, out)? == Flow::Stop {
                    break;
                }
            }
            outcome.token = Some(token);

            if self.mode == MenuMode::Single || !outcome.dispatched.is_empty() {
                return Ok(outcome);
            }
        }
    }
}

fn write_error(e: std::io::Error) -> crate::error::InspectError {
    crate::error::InspectError::Other(format!("console write failed: {e}"))
}
