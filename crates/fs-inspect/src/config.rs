use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{InspectError, Result};

/// Configuration for an inspection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectConfig {
    /// Filename fragment that marks a source file (default: `.c`).
    #[serde(default = "default_source_marker")]
    pub source_marker: String,

    /// Interpreter used to run the diagnostics script (default: `/bin/bash`).
    #[serde(default = "default_script_runner")]
    pub script_runner: String,

    /// Diagnostics script handed to the runner (default: `script.sh`).
    #[serde(default = "default_diagnostics_script")]
    pub diagnostics_script: PathBuf,

    /// Line counter invoked as `<tool> -l <path>` for non-source files.
    #[serde(default = "default_line_count_tool")]
    pub line_count_tool: String,

    /// Command that creates the marker file next to a directory.
    #[serde(default = "default_marker_tool")]
    pub marker_tool: String,

    /// Suffix appended to a directory path to name its marker file.
    #[serde(default = "default_marker_suffix")]
    pub marker_suffix: String,

    /// Command used to change permissions through a symlink.
    #[serde(default = "default_chmod_tool")]
    pub chmod_tool: String,

    /// Mode applied through a symlink by `chmod_tool`, e.g. `u=rwx,g=rw,o=`.
    /// The change lands on the link's target. Off when `None` (default).
    #[serde(default)]
    pub symlink_mode: Option<String>,

    /// What the directory "size" option reports.
    #[serde(default)]
    pub directory_size: DirectorySizePolicy,

    /// How option tokens containing unknown characters are treated.
    #[serde(default)]
    pub validation: ValidationPolicy,

    /// Whether a menu re-prompts until a token is acted on.
    #[serde(default)]
    pub menu_mode: MenuMode,

    /// Size of the fixed link-target buffer (default: 1024).
    #[serde(default = "default_link_target_limit")]
    pub link_target_limit: usize,

    /// Maximum bytes kept from a piped subprocess (default: 4 KiB).
    #[serde(default = "default_capture_limit")]
    pub capture_limit: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectorySizePolicy {
    /// Sum of the sizes of regular files directly inside the directory.
    #[default]
    ChildrenTotal,
    /// The directory inode's own `st_size`.
    InodeSize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Any disallowed character voids the whole token.
    #[default]
    WholeToken,
    /// Disallowed characters are reported, allowed letters still run.
    PerCharacter,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuMode {
    #[default]
    Single,
    Retry,
}

fn default_source_marker() -> String {
    ".c".to_string()
}

fn default_script_runner() -> String {
    "/bin/bash".to_string()
}

fn default_diagnostics_script() -> PathBuf {
    PathBuf::from("script.sh")
}

fn default_line_count_tool() -> String {
    "wc".to_string()
}

fn default_marker_tool() -> String {
    "touch".to_string()
}

fn default_marker_suffix() -> String {
    "_file.txt".to_string()
}

fn default_chmod_tool() -> String {
    "chmod".to_string()
}

fn default_link_target_limit() -> usize {
    1024
}

fn default_capture_limit() -> usize {
    4 * 1024
}

impl InspectConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| InspectError::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| InspectError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Whether `name` is treated as a source file for the diagnostics action.
    pub fn is_source_name(&self, name: &str) -> bool {
        !self.source_marker.is_empty() && name.ends_with(&self.source_marker)
    }
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            source_marker: default_source_marker(),
            script_runner: default_script_runner(),
            diagnostics_script: default_diagnostics_script(),
            line_count_tool: default_line_count_tool(),
            marker_tool: default_marker_tool(),
            marker_suffix: default_marker_suffix(),
            chmod_tool: default_chmod_tool(),
            symlink_mode: None,
            directory_size: DirectorySizePolicy::default(),
            validation: ValidationPolicy::default(),
            menu_mode: MenuMode::default(),
            link_target_limit: default_link_target_limit(),
            capture_limit: default_capture_limit(),
        }
    }
}
