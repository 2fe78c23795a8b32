use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use super::{CaptureMode, run};
use crate::error::{InspectError, Result};
use crate::output::Console;

/// Error and warning totals reported for a source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticCounts {
    pub errors: u32,
    pub warnings: u32,
}

/// Counts plus how the diagnostics process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticReport {
    pub counts: DiagnosticCounts,
    pub pid: Option<u32>,
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl DiagnosticReport {
    /// A run that exited with code 0.
    pub fn clean(counts: DiagnosticCounts) -> Self {
        Self {
            counts,
            pid: None,
            code: Some(0),
            signal: None,
        }
    }
}

/// Compiles or lints a source file and reports its diagnostic totals.
#[async_trait]
pub trait DiagnosticsRunner: Send + Sync {
    async fn run_diagnostics(&self, path: &Path, console: &Console) -> Result<DiagnosticReport>;
}

/// Runs `<runner> <script> <path>` and reads two count lines from its
/// stdout: errors first, then warnings. Parsed counts are returned with
/// the script's exit status even when that status is non-zero.
#[derive(Debug, Clone)]
pub struct ScriptDiagnostics {
    pub runner: String,
    pub script: PathBuf,
    pub capture_limit: usize,
}

impl ScriptDiagnostics {
    pub fn new(runner: impl Into<String>, script: impl Into<PathBuf>, capture_limit: usize) -> Self {
        Self {
            runner: runner.into(),
            script: script.into(),
            capture_limit,
        }
    }
}

#[async_trait]
impl DiagnosticsRunner for ScriptDiagnostics {
    async fn run_diagnostics(&self, path: &Path, console: &Console) -> Result<DiagnosticReport> {
        let args = vec![
            self.script.to_string_lossy().into_owned(),
            path.to_string_lossy().into_owned(),
        ];
        let output = run(
            &self.runner,
            &args,
            CaptureMode::Piped {
                limit: self.capture_limit,
            },
        )
        .await?;

        let lines = output.lines();
        for line in &lines {
            console.line(line);
        }

        match parse_counts(&lines) {
            Some(counts) => {
                info!(path = %path.display(), errors = counts.errors, warnings = counts.warnings, code = ?output.code, "diagnostics collected");
                Ok(DiagnosticReport {
                    counts,
                    pid: output.pid,
                    code: output.code,
                    signal: output.signal,
                })
            }
            None if !output.success() => output
                .into_checked()
                .map(|_| DiagnosticReport::clean(DiagnosticCounts::default())),
            None => Err(InspectError::MalformedOutput {
                command: output.command,
                detail: format!("expected two count lines, got {}", lines.len()),
            }),
        }
    }
}

/// First unsigned integer appearing in `line`.
fn first_number(line: &str) -> Option<u32> {
    line.split(|c: char| !c.is_ascii_digit())
        .find(|part| !part.is_empty())
        .and_then(|digits| digits.parse().ok())
}

fn parse_counts(lines: &[String]) -> Option<DiagnosticCounts> {
    let errors = first_number(lines.first()?)?;
    let warnings = first_number(lines.get(1)?)?;
    Some(DiagnosticCounts { errors, warnings })
}
