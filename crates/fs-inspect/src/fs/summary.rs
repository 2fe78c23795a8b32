use std::os::unix::fs::MetadataExt;
use std::path::Path;

use tracing::warn;

use crate::error::{InspectError, Result};

/// Totals gathered by one non-recursive pass over a directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectorySummary {
    /// Direct entries examined (`.` and `..` excluded).
    pub entries: u64,
    /// Sum of the sizes of regular files.
    pub regular_bytes: u64,
    /// Regular files whose name contains the source marker.
    pub source_files: u64,
    /// `st_size` of the directory inode itself.
    pub inode_size: u64,
}

/// Scan the direct entries of `dir`. Entries are examined without
/// following symlinks; entries that vanish or cannot be stat'd mid-scan
/// are skipped with a warning.
pub fn scan_directory(dir: &Path, source_marker: &str) -> Result<DirectorySummary> {
    let dir_meta =
        std::fs::metadata(dir).map_err(|e| InspectError::from_io("stat", dir, e))?;
    let read_dir = std::fs::read_dir(dir).map_err(|e| InspectError::from_io("opendir", dir, e))?;

    let mut summary = DirectorySummary {
        inode_size: dir_meta.size(),
        ..Default::default()
    };

    for entry in read_dir {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "readdir failed, skipping entry");
                continue;
            }
        };
        summary.entries += 1;

        let path = entry.path();
        let meta = match std::fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "lstat failed, skipping entry");
                continue;
            }
        };

        if meta.file_type().is_file() {
            summary.regular_bytes += meta.len();
            if !source_marker.is_empty()
                && entry.file_name().to_string_lossy().contains(source_marker)
            {
                summary.source_files += 1;
            }
        }
    }

    Ok(summary)
}
