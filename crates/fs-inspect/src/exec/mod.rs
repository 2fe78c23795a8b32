//! External command execution.
//!
//! Commands run as real subprocesses with stdin closed. Stdout is either
//! handed straight to our own stdout or drained through a pipe into a
//! bounded buffer.

pub mod diagnostics;

use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

pub use diagnostics::{DiagnosticCounts, DiagnosticReport, DiagnosticsRunner, ScriptDiagnostics};

use crate::error::{InspectError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// The child writes directly to this process's stdout.
    Inherit,
    /// Stdout is read through a pipe; at most `limit` bytes are kept.
    Piped { limit: usize },
}

/// Outcome of a command that was spawned and waited for.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub command: String,
    pub pid: Option<u32>,
    /// Captured stdout in piped mode.
    pub stdout: Option<Vec<u8>>,
    /// Whether output beyond the capture limit was discarded.
    pub truncated: bool,
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl CommandOutput {
    fn new(command: String, pid: Option<u32>, stdout: Option<Vec<u8>>, truncated: bool, status: ExitStatus) -> Self {
        Self {
            command,
            pid,
            stdout,
            truncated,
            code: status.code(),
            signal: status.signal(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Captured stdout split into lines (empty in inherit mode).
    pub fn lines(&self) -> Vec<String> {
        self.stdout
            .as_deref()
            .map(|bytes| {
                String::from_utf8_lossy(bytes)
                    .lines()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Turn a non-zero exit into `NonZeroExit`. A signaled child reports
    /// `128 + signal`, the shell convention.
    pub fn into_checked(self) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        let code = self
            .code
            .or_else(|| self.signal.map(|s| 128 + s))
            .unwrap_or(1);
        Err(InspectError::NonZeroExit {
            command: self.command,
            code,
        })
    }
}

/// Render `program args...` for messages.
pub fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Spawn `program` with `args`, wait for it and return its status.
///
/// Failing to start the program (not found, not executable) is
/// `SpawnFailed`; a program that ran and failed is still `Ok` here.
pub async fn run(program: &str, args: &[String], mode: CaptureMode) -> Result<CommandOutput> {
    let command = display_command(program, args);
    debug!(command = %command, ?mode, "spawning external command");

    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null());
    match mode {
        CaptureMode::Inherit => cmd.stdout(Stdio::inherit()),
        CaptureMode::Piped { .. } => cmd.stdout(Stdio::piped()),
    };

    let mut child = cmd.spawn().map_err(|source| InspectError::SpawnFailed {
        command: command.clone(),
        source,
    })?;
    let pid = child.id();

    let (stdout, truncated) = match (mode, child.stdout.take()) {
        (CaptureMode::Piped { limit }, Some(mut pipe)) => {
            let mut kept = Vec::new();
            let mut truncated = false;
            let mut chunk = [0u8; 4096];
            loop {
                let n = match pipe.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) => {
                        warn!(command = %command, error = %e, "pipe read failed");
                        break;
                    }
                };
                let room = limit.saturating_sub(kept.len());
                if n > room {
                    truncated = true;
                }
                kept.extend_from_slice(&chunk[..n.min(room)]);
            }
            // Read end closes here, before the wait.
            drop(pipe);
            (Some(kept), truncated)
        }
        _ => (None, false),
    };

    let status = child
        .wait()
        .await
        .map_err(|e| InspectError::Other(format!("waiting for `{command}` failed: {e}")))?;
    debug!(command = %command, ?pid, %status, "external command finished");

    Ok(CommandOutput::new(command, pid, stdout, truncated, status))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_failure() {
        let result = run("nonexistent-tool-for-fs-inspect", &args(&["-l", "x"]), CaptureMode::Inherit).await;
        assert!(matches!(result, Err(InspectError::SpawnFailed { .. })));
    }

    #[tokio::test]
    async fn test_piped_capture() {
        let output = run(
            "sh",
            &args(&["-c", "echo first; echo second"]),
            CaptureMode::Piped { limit: 1024 },
        )
        .await
        .unwrap();

        assert!(output.success());
        assert!(output.pid.is_some());
        assert!(!output.truncated);
        assert_eq!(output.lines(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_capture_is_bounded_but_drained() {
        let output = run(
            "sh",
            &args(&["-c", "i=0; while [ $i -lt 2000 ]; do echo 0123456789; i=$((i+1)); done"]),
            CaptureMode::Piped { limit: 64 },
        )
        .await
        .unwrap();

        assert!(output.success());
        assert!(output.truncated);
        assert_eq!(output.stdout.as_ref().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let output = run("sh", &args(&["-c", "exit 3"]), CaptureMode::Inherit)
            .await
            .unwrap();
        assert_eq!(output.code, Some(3));
        assert!(output.stdout.is_none());

        let err = output.into_checked().unwrap_err();
        assert!(matches!(err, InspectError::NonZeroExit { code: 3, .. }));
    }

    #[tokio::test]
    async fn test_signaled_child() {
        let output = run("sh", &args(&["-c", "kill -9 $$"]), CaptureMode::Inherit)
            .await
            .unwrap();
        assert_eq!(output.code, None);
        assert_eq!(output.signal, Some(9));
        assert!(matches!(
            output.into_checked(),
            Err(InspectError::NonZeroExit { code: 137, .. })
        ));
    }

    #[test]
    fn test_display_command() {
        assert_eq!(display_command("wc", &args(&["-l", "a.txt"])), "wc -l a.txt");
    }
}
