use std::path::Path;

use tracing::{debug, info};

use super::{Session, SessionReport, emit, report_action_error};
use crate::error::{InspectError, Result};
use crate::fs::{AccessRights, inspect_symlink};
use crate::menu::Flow;

pub const LETTERS: &str = "nldta";

const PROMPT: &str = "Options: name(-n), delete symbolic link(-l), size of symbolic link(-d), size of target(-t), access rights(-a): ";

pub fn run(path: &Path, session: &mut Session<'_>) -> Result<SessionReport> {
    let info = inspect_symlink(path, session.config.link_target_limit)?;
    if info.is_broken() {
        debug!(path = %path.display(), target = ?info.target, "symlink target unavailable");
    }
    let mut failures = 0;
    let mut removed = false;

    let menu = session.menu(PROMPT, LETTERS);
    let outcome = menu.run(&mut *session.source, &mut *session.out, |letter, _, out| {
        match letter {
            'n' => emit(out, format_args!("Name: {}", path.display()))?,
            'l' => {
                // Nothing else in the token can apply once the link is gone.
                match std::fs::remove_file(path) {
                    Ok(()) => {
                        info!(path = %path.display(), "symbolic link removed");
                        removed = true;
                        emit(out, format_args!("Symbolic link {} removed", path.display()))?;
                    }
                    Err(e) => {
                        let err = InspectError::from_io("unlink", path, e);
                        report_action_error(out, &mut failures, letter, &err);
                    }
                }
                return Ok(Flow::Stop);
            }
            'd' => emit(
                out,
                format_args!("Size of symbolic link: {} bytes", info.link.size),
            )?,
            't' => match info.target_stat() {
                Ok(target) => emit(
                    out,
                    format_args!("Size of target file: {} bytes", target.size),
                )?,
                Err(err) => report_action_error(out, &mut failures, letter, &err),
            },
            'a' => emit(
                out,
                format_args!("Access rights:\n{}", AccessRights::from_mode(info.link.mode)),
            )?,
            _ => {}
        }
        Ok(Flow::Continue)
    })?;

    Ok(SessionReport {
        menu: outcome,
        failed_actions: failures,
        path_removed: removed,
    })
}
