use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use super::{Session, SessionReport, emit, report_action_error};
use crate::error::{InspectError, Result};
use crate::fs::{AccessRights, stat};
use crate::menu::{CommandSource, Flow};

pub const LETTERS: &str = "nldahm";

const PROMPT: &str = "Options: name(-n), size(-d), hard link count(-h), time of last modification(-m), access rights(-a), create symbolic link(-l): ";

pub fn run(path: &Path, session: &mut Session<'_>) -> Result<SessionReport> {
    let st = stat(path, true)?;
    let mut failures = 0;

    let menu = session.menu(PROMPT, LETTERS);
    let outcome = menu.run(&mut *session.source, &mut *session.out, |letter, source, out| {
        match letter {
            'n' => emit(out, format_args!("Name: {}", path.display()))?,
            'd' => emit(out, format_args!("Size: {} bytes", st.size))?,
            'h' => emit(out, format_args!("Hard link count: {}", st.hard_links))?,
            'm' => emit(
                out,
                format_args!("Last modified time: {}", st.modified_display()),
            )?,
            'a' => emit(
                out,
                format_args!("Access rights:\n{}", AccessRights::from_mode(st.mode)),
            )?,
            'l' => {
                if let Err(e) = create_link(path, source, out) {
                    report_action_error(out, &mut failures, letter, &e);
                }
            }
            _ => {}
        }
        Ok(Flow::Continue)
    })?;

    Ok(SessionReport {
        menu: outcome,
        failed_actions: failures,
        path_removed: false,
    })
}

/// Ask for a link name and create a symlink there pointing at `target`.
fn create_link(target: &Path, source: &mut dyn CommandSource, out: &mut dyn Write) -> Result<PathBuf> {
    write!(out, "Enter link name: ")
        .and_then(|_| out.flush())
        .map_err(|e| InspectError::Other(format!("console write failed: {e}")))?;

    let link = source
        .next_token()
        .map(PathBuf::from)
        .ok_or_else(|| InspectError::InvalidOption("missing link name".to_string()))?;

    std::os::unix::fs::symlink(target, &link).map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists => InspectError::LinkExists(link.clone()),
        _ => InspectError::from_io("symlink", &link, e),
    })?;

    info!(link = %link.display(), target = %target.display(), "symbolic link created");
    emit(
        out,
        format_args!("Symbolic link {} -> {} created", link.display(), target.display()),
    )?;
    Ok(link)
}
