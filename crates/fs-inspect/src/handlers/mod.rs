//! Interactive per-type sessions.
//!
//! Each session snapshots the path's metadata, runs one option menu and
//! reports what it did. A metadata failure before the menu is returned
//! as an error and ends the branch; failures of individual actions are
//! printed and counted instead.

pub mod directory;
pub mod file;
pub mod symlink;

use std::io::Write;
use std::path::Path;

use tracing::warn;

use crate::config::InspectConfig;
use crate::error::{InspectError, Result};
use crate::fs::FileKind;
use crate::menu::{CommandSource, MenuOutcome, OptionMenu};

/// Everything a session needs besides the path.
pub struct Session<'a> {
    pub config: &'a InspectConfig,
    pub source: &'a mut dyn CommandSource,
    pub out: &'a mut dyn Write,
}

impl<'a> Session<'a> {
    pub fn new(
        config: &'a InspectConfig,
        source: &'a mut dyn CommandSource,
        out: &'a mut dyn Write,
    ) -> Self {
        Self { config, source, out }
    }

    fn menu<'m>(&self, prompt: &'m str, letters: &'m str) -> OptionMenu<'m> {
        OptionMenu::new(prompt, letters)
            .policy(self.config.validation)
            .mode(self.config.menu_mode)
    }
}

/// What a finished session did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub menu: MenuOutcome,
    /// Actions that ran but failed.
    pub failed_actions: usize,
    /// The session removed the path it was inspecting.
    pub path_removed: bool,
}

/// Run the session matching `kind`.
pub fn run_session(kind: FileKind, path: &Path, session: &mut Session<'_>) -> Result<SessionReport> {
    match kind {
        FileKind::Regular => file::run(path, session),
        FileKind::Directory => directory::run(path, session),
        FileKind::Symlink => symlink::run(path, session),
        FileKind::Other => Err(InspectError::UnsupportedType {
            path: path.to_path_buf(),
            kind,
        }),
    }
}

/// Print a failed action and count it.
fn report_action_error(out: &mut dyn Write, failures: &mut usize, letter: char, err: &InspectError) {
    warn!(option = %letter, error = %err, "session action failed");
    *failures += 1;
    let _ = writeln!(out, "Error: {err}");
}

fn emit(out: &mut dyn Write, text: std::fmt::Arguments<'_>) -> Result<()> {
    out.write_fmt(text)
        .and_then(|_| out.write_all(b"\n"))
        .map_err(|e| InspectError::Other(format!("console write failed: {e}")))
}
