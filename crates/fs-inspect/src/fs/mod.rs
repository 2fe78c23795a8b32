pub mod metadata;
pub mod rights;
pub mod summary;

use std::fmt;

pub use metadata::{FileStat, LinkTarget, SymlinkInfo, classify, inspect_symlink, read_link, stat};
pub use rights::{AccessRights, Triad};
pub use summary::{DirectorySummary, scan_directory};

/// File type as seen by a non-following `lstat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    Other,
}

impl FileKind {
    pub fn from_file_type(ft: std::fs::FileType) -> Self {
        if ft.is_symlink() {
            FileKind::Symlink
        } else if ft.is_dir() {
            FileKind::Directory
        } else if ft.is_file() {
            FileKind::Regular
        } else {
            FileKind::Other
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileKind::Regular => "regular file",
            FileKind::Directory => "directory",
            FileKind::Symlink => "symbolic link",
            FileKind::Other => "unknown file type",
        };
        f.write_str(label)
    }
}
