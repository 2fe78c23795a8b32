use std::os::unix::fs::{PermissionsExt, symlink};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs_inspect::config::InspectConfig;
use fs_inspect::error::{InspectError, Result};
use fs_inspect::exec::{DiagnosticCounts, DiagnosticReport, DiagnosticsRunner};
use fs_inspect::fs::FileKind;
use fs_inspect::menu::ScriptedSource;
use fs_inspect::output::{CaptureBuffer, Console};
use fs_inspect::Inspector;

struct FixedDiagnostics(Result<DiagnosticCounts>);

#[async_trait]
impl DiagnosticsRunner for FixedDiagnostics {
    async fn run_diagnostics(&self, path: &Path, console: &Console) -> Result<DiagnosticReport> {
        console.line(format_args!("checked {}", path.display()));
        match &self.0 {
            Ok(counts) => Ok(DiagnosticReport::clean(*counts)),
            Err(InspectError::NonZeroExit { command, code }) => Err(InspectError::NonZeroExit {
                command: command.clone(),
                code: *code,
            }),
            Err(e) => Err(InspectError::Other(e.to_string())),
        }
    }
}

fn temp_inspector(config: InspectConfig, tokens: &[&str]) -> (tempfile::TempDir, Inspector, CaptureBuffer) {
    let tmp = tempfile::tempdir().unwrap();
    let (console, buffer) = Console::capture();
    let inspector = Inspector::new(config)
        .unwrap()
        .with_console(console)
        .with_source(ScriptedSource::new(tokens.iter().copied()))
        .with_diagnostics(FixedDiagnostics(Ok(DiagnosticCounts {
            errors: 0,
            warnings: 3,
        })));
    (tmp, inspector, buffer)
}

fn status_lines(output: &str) -> Vec<&str> {
    output
        .lines()
        .filter(|l| l.starts_with("Worker ") && (l.contains(" exited with code ") || l.contains(" terminated abnormally")))
        .collect()
}

#[tokio::test]
async fn test_source_file_reports_inner_then_outer() {
    let (tmp, inspector, buffer) = temp_inspector(InspectConfig::default(), &["-nd"]);
    let file = tmp.path().join("prog.c");
    std::fs::write(&file, "int main(void) { return 0; }\n").unwrap();

    let report = inspector.inspect(&file).await.unwrap();
    let output = buffer.contents();

    assert_eq!(report.kind, FileKind::Regular);
    assert!(output.starts_with(&format!("{}: regular file\n", file.display())));
    assert!(output.contains(&format!("Name: {}", file.display())));
    assert!(output.contains("Size: 29 bytes"));
    assert!(output.contains(&format!("checked {}", file.display())));
    assert!(output.contains("0 errors, 3 warnings"));

    let lines = status_lines(&output);
    assert_eq!(lines.len(), 2, "status lines: {lines:?}");
    assert!(lines[0].contains("diagnostics"));
    assert!(lines[0].ends_with("exited with code 0"));
    assert!(lines[1].contains("session"));
    assert!(lines[1].ends_with("exited with code 0"));

    let nested = report.nested().unwrap();
    assert_eq!(nested.exit_code, 0);
    assert_eq!(report.worker.exit_code, 0);
}

#[tokio::test]
async fn test_plain_file_runs_line_counter() {
    let (tmp, inspector, buffer) = temp_inspector(InspectConfig::default(), &["-h"]);
    let file = tmp.path().join("notes.txt");
    std::fs::write(&file, "one\ntwo\nthree\n").unwrap();

    let report = inspector.inspect(&file).await.unwrap();

    let nested = report.nested().unwrap();
    assert!(nested.label.starts_with("wc -l "));
    assert!(nested.pid.is_some());
    assert_eq!(nested.exit_code, 0);
    assert!(nested.exited);
    assert!(buffer.contents().contains("Hard link count: 1"));
}

#[tokio::test]
async fn test_missing_line_counter_is_spawn_failure() {
    let config = InspectConfig {
        line_count_tool: "nonexistent-line-counter".to_string(),
        ..Default::default()
    };
    let (tmp, inspector, buffer) = temp_inspector(config, &["-n"]);
    let file = tmp.path().join("data.txt");
    std::fs::write(&file, "x\n").unwrap();

    let summary = inspector.run(&[file.clone()]).await;

    assert_eq!(summary.exit_code, 0);
    let report = &summary.reports[0];
    assert_eq!(report.nested().unwrap().exit_code, 127);
    assert_eq!(report.worker.exit_code, 127);
    assert!(buffer.contents().contains("failed to spawn `nonexistent-line-counter"));
}

#[tokio::test]
async fn test_failing_diagnostics_folds_exit_code() {
    let (tmp, inspector, buffer) = temp_inspector(InspectConfig::default(), &["-n"]);
    let inspector = inspector.with_diagnostics(FixedDiagnostics(Err(InspectError::NonZeroExit {
        command: "bash script.sh".to_string(),
        code: 2,
    })));
    let file = tmp.path().join("broken.c");
    std::fs::write(&file, "int main(").unwrap();

    let report = inspector.inspect(&file).await.unwrap();

    assert_eq!(report.nested().unwrap().exit_code, 2);
    assert_eq!(report.worker.exit_code, 2);
    assert!(buffer.contents().contains("exited with code 2"));
}

#[tokio::test]
async fn test_script_exit_status_survives_parsed_counts() {
    let tmp = tempfile::tempdir().unwrap();
    let script = tmp.path().join("check.sh");
    std::fs::write(&script, "echo 1\necho 2\nexit 3\n").unwrap();
    let file = tmp.path().join("p.c");
    std::fs::write(&file, "int x;\n").unwrap();

    let config = InspectConfig {
        script_runner: "sh".to_string(),
        diagnostics_script: script,
        ..Default::default()
    };
    let (console, buffer) = Console::capture();
    let inspector = Inspector::new(config)
        .unwrap()
        .with_console(console)
        .with_source(ScriptedSource::new(["-n"]));

    let report = inspector.inspect(&file).await.unwrap();
    let output = buffer.contents();

    let nested = report.nested().unwrap();
    assert_eq!(nested.exit_code, 3);
    assert!(nested.pid.is_some());
    assert_eq!(report.worker.exit_code, 3);
    assert!(output.contains("1 errors, 2 warnings"));
    let lines = status_lines(&output);
    assert!(lines[0].contains(", pid "));
    assert!(lines[0].ends_with("exited with code 3"));
}

#[tokio::test]
async fn test_directory_session_and_marker_file() {
    let (tmp, inspector, buffer) = temp_inspector(InspectConfig::default(), &["-ndc"]);
    let dir = tmp.path().join("project");
    std::fs::create_dir(&dir).unwrap();
    std::fs::write(dir.join("a.c"), [0u8; 10]).unwrap();
    std::fs::write(dir.join("b.c"), [0u8; 20]).unwrap();
    std::fs::write(dir.join("readme.txt"), [0u8; 5]).unwrap();

    let report = inspector.inspect(&dir).await.unwrap();
    let output = buffer.contents();

    assert_eq!(report.kind, FileKind::Directory);
    assert!(output.contains("Total size: 35 bytes"));
    assert!(output.contains("Total .c files: 2"));
    assert!(tmp.path().join("project_file.txt").exists());
    assert_eq!(report.nested().unwrap().exit_code, 0);
}

#[tokio::test]
async fn test_symlink_leaves_target_mode_by_default() {
    let (tmp, inspector, buffer) = temp_inspector(InspectConfig::default(), &["-n"]);
    let target = tmp.path().join("target.txt");
    std::fs::write(&target, "x").unwrap();
    std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o644)).unwrap();
    let link = tmp.path().join("link");
    symlink(&target, &link).unwrap();

    let report = inspector.inspect(&link).await.unwrap();

    assert!(report.nested().is_none());
    assert_eq!(report.worker.exit_code, 0);
    assert_eq!(status_lines(&buffer.contents()).len(), 1);
    let mode = std::fs::metadata(&target).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o644);
}

#[tokio::test]
async fn test_symlink_mode_change_when_configured() {
    let config = InspectConfig {
        symlink_mode: Some("u=rwx,g=rw,o=".to_string()),
        ..Default::default()
    };
    let (tmp, inspector, buffer) = temp_inspector(config, &["-t"]);
    let target = tmp.path().join("target.txt");
    std::fs::write(&target, [0u8; 7]).unwrap();
    std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o644)).unwrap();
    let link = tmp.path().join("link");
    symlink(&target, &link).unwrap();

    let report = inspector.inspect(&link).await.unwrap();

    assert_eq!(report.kind, FileKind::Symlink);
    assert!(buffer.contents().contains("Size of target file: 7 bytes"));
    assert_eq!(report.nested().unwrap().exit_code, 0);
    let mode = std::fs::metadata(&target).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o760);
}

#[tokio::test]
async fn test_broken_symlink_does_not_crash() {
    let (tmp, inspector, buffer) = temp_inspector(InspectConfig::default(), &["-ndt"]);
    let link = tmp.path().join("dangling");
    symlink(tmp.path().join("missing.txt"), &link).unwrap();

    let report = inspector.inspect(&link).await.unwrap();
    let output = buffer.contents();

    assert!(output.contains("Name:"));
    assert!(output.contains("Size of symbolic link:"));
    assert!(output.contains("broken symbolic link"));
    assert!(report.nested().is_none());
    assert_eq!(report.worker.exit_code, 0);
}

#[tokio::test]
async fn test_unlinked_symlink_skips_side_action() {
    let config = InspectConfig {
        symlink_mode: Some("u=rwx,g=rw,o=".to_string()),
        ..Default::default()
    };
    let (tmp, inspector, buffer) = temp_inspector(config, &["-l"]);
    let target = tmp.path().join("target.txt");
    std::fs::write(&target, "x").unwrap();
    std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o644)).unwrap();
    let link = tmp.path().join("link");
    symlink(&target, &link).unwrap();

    let report = inspector.inspect(&link).await.unwrap();
    let output = buffer.contents();

    assert!(std::fs::symlink_metadata(&link).is_err());
    assert!(output.contains("side action skipped"));
    assert_eq!(report.nested().unwrap().exit_code, 0);
    assert_eq!(report.worker.exit_code, 0);
    let mode = std::fs::metadata(&target).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o644);
}

#[tokio::test]
async fn test_failures_are_isolated_per_path() {
    let (tmp, inspector, buffer) = temp_inspector(InspectConfig::default(), &["-n", "-n"]);
    let first = tmp.path().join("first.txt");
    let second = tmp.path().join("second.txt");
    std::fs::write(&first, "1").unwrap();
    std::fs::write(&second, "2").unwrap();
    let missing = tmp.path().join("missing.txt");

    let paths: Vec<PathBuf> = vec![first.clone(), missing.clone(), second.clone()];
    let summary = inspector.run(&paths).await;
    let output = buffer.contents();

    assert_eq!(summary.exit_code, 1);
    assert_eq!(summary.reports.len(), 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].0, missing);
    assert!(matches!(summary.failures[0].1, InspectError::NotFound(_)));

    let first_at = output.find(&format!("Name: {}", first.display())).unwrap();
    let missing_at = output.find("no such file or directory").unwrap();
    let second_at = output.find(&format!("Name: {}", second.display())).unwrap();
    assert!(first_at < missing_at && missing_at < second_at);
    assert_eq!(status_lines(&output).len(), 4);
}

#[tokio::test]
async fn test_unsupported_type() {
    let (_tmp, inspector, buffer) = temp_inspector(InspectConfig::default(), &[]);

    let summary = inspector.run(&[PathBuf::from("/dev/null")]).await;

    assert_eq!(summary.exit_code, 1);
    assert!(summary.reports.is_empty());
    assert!(matches!(
        summary.failures[0].1,
        InspectError::UnsupportedType { kind: FileKind::Other, .. }
    ));
    assert!(buffer.contents().contains("/dev/null: unknown file type"));
    assert!(status_lines(&buffer.contents()).is_empty());
}

#[tokio::test]
async fn test_invalid_token_still_runs_side_action() {
    let (tmp, inspector, buffer) = temp_inspector(InspectConfig::default(), &["-nq"]);
    let file = tmp.path().join("lib.c");
    std::fs::write(&file, "").unwrap();

    let report = inspector.inspect(&file).await.unwrap();
    let output = buffer.contents();

    assert!(output.contains("Invalid option"));
    assert!(!output.contains("Name:"));
    assert_eq!(report.worker.exit_code, 0);
    assert_eq!(status_lines(&output).len(), 2);
}
