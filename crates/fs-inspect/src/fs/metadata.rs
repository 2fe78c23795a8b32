use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};

use super::FileKind;
use crate::error::{InspectError, Result};

/// Point-in-time snapshot of a path's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub kind: FileKind,
    pub size: u64,
    pub hard_links: u64,
    pub modified: SystemTime,
    /// Permission bits only (`mode & 0o777`).
    pub mode: u32,
}

impl FileStat {
    fn from_metadata(meta: &std::fs::Metadata) -> Self {
        Self {
            kind: FileKind::from_file_type(meta.file_type()),
            size: meta.len(),
            hard_links: meta.nlink(),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            mode: meta.mode() & 0o777,
        }
    }

    /// Modification time in the classic `ctime` layout, local time.
    pub fn modified_display(&self) -> String {
        let local: DateTime<Local> = self.modified.into();
        local.format("%a %b %e %H:%M:%S %Y").to_string()
    }
}

/// Stat `path`. With `follow = false` the link itself is described.
pub fn stat(path: &Path, follow: bool) -> Result<FileStat> {
    let meta = if follow {
        std::fs::metadata(path)
    } else {
        std::fs::symlink_metadata(path)
    };
    let meta = meta.map_err(|e| {
        InspectError::from_io(if follow { "stat" } else { "lstat" }, path, e)
    })?;
    Ok(FileStat::from_metadata(&meta))
}

/// Classify a path without following a trailing symlink.
pub fn classify(path: &Path) -> Result<FileKind> {
    stat(path, false).map(|s| s.kind)
}

/// Read a symlink's target. A target of `limit` bytes or more would not
/// fit the fixed buffer and is rejected as `Truncated`.
pub fn read_link(path: &Path, limit: usize) -> Result<PathBuf> {
    if classify(path)? != FileKind::Symlink {
        return Err(InspectError::NotASymlink(path.to_path_buf()));
    }

    let target = std::fs::read_link(path).map_err(|e| InspectError::from_io("readlink", path, e))?;
    if target.as_os_str().as_bytes().len() >= limit {
        return Err(InspectError::Truncated {
            path: path.to_path_buf(),
            limit,
        });
    }
    Ok(target)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Resolved(FileStat),
    Broken { reason: String },
}

/// A symlink together with what it points at.
#[derive(Debug, Clone)]
pub struct SymlinkInfo {
    pub path: PathBuf,
    pub link: FileStat,
    pub target_path: Option<PathBuf>,
    pub target: LinkTarget,
}

impl SymlinkInfo {
    pub fn is_broken(&self) -> bool {
        matches!(self.target, LinkTarget::Broken { .. })
    }

    /// Stat of the resolved target, or `BrokenSymlink`.
    pub fn target_stat(&self) -> Result<&FileStat> {
        match &self.target {
            LinkTarget::Resolved(stat) => Ok(stat),
            LinkTarget::Broken { reason } => Err(InspectError::BrokenSymlink {
                path: self.path.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

/// Describe a symlink. Only failing to stat the link itself is an error;
/// an unreadable or missing target is recorded as `LinkTarget::Broken`.
pub fn inspect_symlink(path: &Path, limit: usize) -> Result<SymlinkInfo> {
    let link = stat(path, false)?;
    if link.kind != FileKind::Symlink {
        return Err(InspectError::NotASymlink(path.to_path_buf()));
    }

    let target_path = match read_link(path, limit) {
        Ok(target) => target,
        Err(e) => {
            return Ok(SymlinkInfo {
                path: path.to_path_buf(),
                link,
                target_path: None,
                target: LinkTarget::Broken {
                    reason: e.to_string(),
                },
            });
        }
    };

    let target = match stat(path, true) {
        Ok(stat) => LinkTarget::Resolved(stat),
        Err(e) => LinkTarget::Broken {
            reason: e.to_string(),
        },
    };

    Ok(SymlinkInfo {
        path: path.to_path_buf(),
        link,
        target_path: Some(target_path),
        target,
    })
}
