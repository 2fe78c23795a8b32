use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::InspectConfig;
use crate::fs::FileKind;

/// External work the nested worker performs for a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideAction {
    /// Run the diagnostics collaborator on a source file.
    Diagnostics,
    /// `<line_count_tool> -l <path>`.
    LineCount,
    /// `<marker_tool> <marker>` where the marker is named after the directory.
    MarkerFile(PathBuf),
    /// `<chmod_tool> <mode> <path>`.
    ChangeMode(String),
    None,
}

/// Pick the side action for a classified path.
pub fn plan(kind: FileKind, path: &Path, config: &InspectConfig) -> SideAction {
    match kind {
        FileKind::Regular => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if config.is_source_name(&name) {
                SideAction::Diagnostics
            } else {
                SideAction::LineCount
            }
        }
        FileKind::Directory => SideAction::MarkerFile(marker_path(path, &config.marker_suffix)),
        FileKind::Symlink => match &config.symlink_mode {
            Some(mode) => SideAction::ChangeMode(mode.clone()),
            None => SideAction::None,
        },
        FileKind::Other => SideAction::None,
    }
}

/// `<path><suffix>`, with trailing slashes removed from the path first.
pub fn marker_path(dir: &Path, suffix: &str) -> PathBuf {
    let raw = dir.as_os_str().to_string_lossy();
    let trimmed = raw.trim_end_matches('/');
    let base = if trimmed.is_empty() { "/" } else { trimmed };
    let mut marker = OsString::from(base);
    marker.push(suffix);
    PathBuf::from(marker)
}

/// Program and arguments for actions that are plain commands.
pub fn command_line(action: &SideAction, path: &Path, config: &InspectConfig) -> Option<(String, Vec<String>)> {
    let path = path.to_string_lossy().into_owned();
    match action {
        SideAction::LineCount => Some((config.line_count_tool.clone(), vec!["-l".to_string(), path])),
        SideAction::MarkerFile(marker) => Some((
            config.marker_tool.clone(),
            vec![marker.to_string_lossy().into_owned()],
        )),
        SideAction::ChangeMode(mode) => Some((config.chmod_tool.clone(), vec![mode.clone(), path])),
        SideAction::Diagnostics | SideAction::None => None,
    }
}
