use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::fs::FileKind;

#[derive(Error, Debug)]
pub enum InspectError {
    #[error("{}: no such file or directory", .0.display())]
    NotFound(PathBuf),

    #[error("{}: permission denied", .0.display())]
    PermissionDenied(PathBuf),

    #[error("{}: unsupported file type ({kind})", path.display())]
    UnsupportedType { path: PathBuf, kind: FileKind },

    #[error("failed to spawn `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with code {code}")]
    NonZeroExit { command: String, code: i32 },

    #[error("{}: broken symbolic link ({reason})", path.display())]
    BrokenSymlink { path: PathBuf, reason: String },

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("{}: link name already exists", .0.display())]
    LinkExists(PathBuf),

    #[error("{}: link target exceeds {limit} bytes", path.display())]
    Truncated { path: PathBuf, limit: usize },

    #[error("{}: not a symbolic link", .0.display())]
    NotASymlink(PathBuf),

    #[error("`{command}` produced unexpected output: {detail}")]
    MalformedOutput { command: String, detail: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("{operation} {}: {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl InspectError {
    /// Map an IO failure on `path` onto the taxonomy, keeping the
    /// operation name for anything that is not a lookup or access failure.
    pub fn from_io(operation: &'static str, path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => InspectError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => InspectError::PermissionDenied(path.to_path_buf()),
            _ => InspectError::Io {
                operation,
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, InspectError>;
