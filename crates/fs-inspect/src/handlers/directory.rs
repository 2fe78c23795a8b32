use std::path::Path;

use super::{Session, SessionReport, emit};
use crate::config::DirectorySizePolicy;
use crate::error::Result;
use crate::fs::{AccessRights, scan_directory, stat};
use crate::menu::Flow;

pub const LETTERS: &str = "ndca";

const PROMPT: &str = "Options: name(-n), size(-d), access rights(-a), number of source files(-c): ";

pub fn run(path: &Path, session: &mut Session<'_>) -> Result<SessionReport> {
    let config = session.config;
    let st = stat(path, true)?;
    let summary = scan_directory(path, &config.source_marker)?;

    let size = match config.directory_size {
        DirectorySizePolicy::ChildrenTotal => summary.regular_bytes,
        DirectorySizePolicy::InodeSize => summary.inode_size,
    };

    let menu = session.menu(PROMPT, LETTERS);
    let outcome = menu.run(&mut *session.source, &mut *session.out, |letter, _, out| {
        match letter {
            'n' => emit(out, format_args!("Name: {}", path.display()))?,
            'd' => emit(out, format_args!("Total size: {size} bytes"))?,
            'c' => emit(
                out,
                format_args!(
                    "Total {} files: {}",
                    config.source_marker, summary.source_files
                ),
            )?,
            'a' => emit(
                out,
                format_args!("Access rights:\n{}", AccessRights::from_mode(st.mode)),
            )?,
            _ => {}
        }
        Ok(Flow::Continue)
    })?;

    Ok(SessionReport {
        menu: outcome,
        failed_actions: 0,
        path_removed: false,
    })
}
