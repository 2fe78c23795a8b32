pub mod config;
pub mod error;
pub mod exec;
pub mod fs;
pub mod handlers;
pub mod menu;
pub mod output;
pub mod toolbox;
pub mod worker;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::config::InspectConfig;
use crate::error::{InspectError, Result};
use crate::exec::{CaptureMode, DiagnosticsRunner, ScriptDiagnostics};
use crate::fs::FileKind;
use crate::handlers::Session;
use crate::menu::{CommandSource, ReaderSource};
use crate::output::Console;
use crate::toolbox::SideAction;
use crate::worker::{ChildResult, JobStatus, Supervisor, WorkerTask};

/// Token source shared by the sessions of one run. Sessions run one at a
/// time, so the lock is never contended.
pub type SharedSource = Arc<Mutex<Box<dyn CommandSource>>>;

/// Where the orchestrator is in handling one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Classifying,
    Dispatching,
    SpawningWorker,
    RunningExternalCommand,
    Collecting,
}

/// Classifies paths and runs a two-level worker tree for each one.
pub struct Inspector {
    config: Arc<InspectConfig>,
    console: Console,
    source: SharedSource,
    diagnostics: Arc<dyn DiagnosticsRunner>,
    supervisor: Supervisor,
}

impl Inspector {
    /// Create an inspector reading options from stdin and writing to stdout.
    pub fn new(config: InspectConfig) -> Result<Self> {
        if config.link_target_limit == 0 {
            return Err(InspectError::Config("link_target_limit must be positive".into()));
        }
        if config.capture_limit == 0 {
            return Err(InspectError::Config("capture_limit must be positive".into()));
        }

        let console = Console::stdout();
        let diagnostics = ScriptDiagnostics::new(
            config.script_runner.clone(),
            config.diagnostics_script.clone(),
            config.capture_limit,
        );

        Ok(Self {
            config: Arc::new(config),
            supervisor: Supervisor::new(console.clone()),
            console,
            source: Arc::new(Mutex::new(Box::new(ReaderSource::stdin()))),
            diagnostics: Arc::new(diagnostics),
        })
    }

    pub fn with_console(mut self, console: Console) -> Self {
        self.supervisor = Supervisor::new(console.clone());
        self.console = console;
        self
    }

    pub fn with_source(mut self, source: impl CommandSource + 'static) -> Self {
        self.source = Arc::new(Mutex::new(Box::new(source)));
        self
    }

    pub fn with_diagnostics(mut self, runner: impl DiagnosticsRunner + 'static) -> Self {
        self.diagnostics = Arc::new(runner);
        self
    }

    pub fn config(&self) -> &InspectConfig {
        &self.config
    }

    /// Inspect every path in order, one worker tree at a time. A failing
    /// path never stops the ones after it.
    pub async fn run(&self, paths: &[PathBuf]) -> RunSummary {
        let mut summary = RunSummary::default();
        for path in paths {
            match self.inspect(path).await {
                Ok(report) => summary.reports.push(report),
                Err(e) => summary.failures.push((path.clone(), e)),
            }
        }
        summary.exit_code = if summary.failures.is_empty() { 0 } else { 1 };
        summary
    }

    /// Classify `path`, run its session worker and nested side-action
    /// worker, and report both statuses (nested first).
    pub async fn inspect(&self, path: &Path) -> Result<PathReport> {
        debug!(stage = ?Stage::Classifying, path = %path.display());
        let kind = match fs::classify(path) {
            Ok(kind) => kind,
            Err(e) => {
                error!(path = %path.display(), error = %e, "classification failed");
                self.console.line(&e);
                return Err(e);
            }
        };
        self.console.line(format_args!("{}: {}", path.display(), kind));

        if kind == FileKind::Other {
            return Err(InspectError::UnsupportedType {
                path: path.to_path_buf(),
                kind,
            });
        }

        debug!(stage = ?Stage::Dispatching, path = %path.display(), %kind);
        let removed = Arc::new(AtomicBool::new(false));
        let mut task = self.session_task(kind, path, removed.clone());
        if let Some(side) = self.side_task(kind, path, removed) {
            task = task.then(side);
        }

        debug!(stage = ?Stage::SpawningWorker, task = task.label());
        let worker = self.supervisor.run(task).await;

        debug!(stage = ?Stage::Collecting, path = %path.display());
        self.console.line(worker.status_line());
        debug!(stage = ?Stage::Idle);

        Ok(PathReport {
            path: path.to_path_buf(),
            kind,
            worker,
        })
    }

    fn session_task(&self, kind: FileKind, path: &Path, removed: Arc<AtomicBool>) -> WorkerTask {
        let config = self.config.clone();
        let source = self.source.clone();
        let console = self.console.clone();
        let path = path.to_path_buf();

        WorkerTask::new(format!("{kind} session {}", path.display()), async move {
            let mut out = console.clone();
            let session_path = path.clone();
            let joined = tokio::task::spawn_blocking(move || {
                let mut source = source.blocking_lock();
                let mut session = Session::new(&config, &mut **source, &mut out);
                handlers::run_session(kind, &session_path, &mut session)
            })
            .await;

            match joined {
                Ok(Ok(report)) => {
                    debug!(path = %path.display(), dispatched = ?report.menu.dispatched, failed = report.failed_actions, "session finished");
                    removed.store(report.path_removed, Ordering::Release);
                    JobStatus::exited(0)
                }
                Ok(Err(e)) => {
                    error!(path = %path.display(), error = %e, "session aborted");
                    console.line(&e);
                    JobStatus::exited(1)
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "session worker failed");
                    JobStatus {
                        pid: None,
                        code: 1,
                        exited: false,
                        signal: None,
                    }
                }
            }
        })
    }

    /// Nested worker for the path's side action. It does nothing once the
    /// session has removed the path.
    fn side_task(&self, kind: FileKind, path: &Path, removed: Arc<AtomicBool>) -> Option<WorkerTask> {
        let action = toolbox::plan(kind, path, &self.config);
        let console = self.console.clone();
        let path = path.to_path_buf();

        match action {
            SideAction::None => None,
            SideAction::Diagnostics => {
                let diagnostics = self.diagnostics.clone();
                Some(WorkerTask::new(format!("diagnostics {}", path.display()), async move {
                    if skip_removed(&removed, &path, &console) {
                        return JobStatus::exited(0);
                    }
                    debug!(stage = ?Stage::RunningExternalCommand, path = %path.display(), "diagnostics");
                    match diagnostics.run_diagnostics(&path, &console).await {
                        Ok(report) => {
                            console.line(format_args!(
                                "{}: {} errors, {} warnings",
                                path.display(),
                                report.counts.errors,
                                report.counts.warnings
                            ));
                            JobStatus::from_process(report.pid, report.code, report.signal)
                        }
                        Err(e) => {
                            console.line(&e);
                            JobStatus::exited(exit_code_for(&e))
                        }
                    }
                }))
            }
            action => {
                let (program, args) = toolbox::command_line(&action, &path, &self.config)?;
                let label = exec::display_command(&program, &args);
                Some(WorkerTask::new(label, async move {
                    if skip_removed(&removed, &path, &console) {
                        return JobStatus::exited(0);
                    }
                    debug!(stage = ?Stage::RunningExternalCommand, program = %program);
                    match exec::run(&program, &args, CaptureMode::Inherit).await {
                        Ok(output) => JobStatus::from_output(&output),
                        Err(e) => {
                            console.line(&e);
                            JobStatus::exited(exit_code_for(&e))
                        }
                    }
                }))
            }
        }
    }
}

fn skip_removed(removed: &AtomicBool, path: &Path, console: &Console) -> bool {
    if !removed.load(Ordering::Acquire) {
        return false;
    }
    debug!(path = %path.display(), "path removed by session, side action skipped");
    console.line(format_args!("{}: removed, side action skipped", path.display()));
    true
}

/// Exit status a branch reports for a side-action failure.
fn exit_code_for(err: &InspectError) -> i32 {
    match err {
        InspectError::SpawnFailed { .. } => 127,
        InspectError::NonZeroExit { code, .. } => *code,
        _ => 1,
    }
}

/// Outcome for one path that was classified and dispatched.
#[derive(Debug, Clone)]
pub struct PathReport {
    pub path: PathBuf,
    pub kind: FileKind,
    /// The first-level worker, with the nested worker folded in.
    pub worker: ChildResult,
}

impl PathReport {
    pub fn nested(&self) -> Option<&ChildResult> {
        self.worker.nested.as_deref()
    }
}

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<PathReport>,
    /// Paths that could not be classified or had an unsupported type.
    pub failures: Vec<(PathBuf, InspectError)>,
    /// 1 when any path failed, otherwise 0. Worker exit codes are reported
    /// but do not affect it.
    pub exit_code: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_limits() {
        let config = InspectConfig {
            link_target_limit: 0,
            ..Default::default()
        };
        assert!(matches!(Inspector::new(config), Err(InspectError::Config(_))));

        let config = InspectConfig {
            capture_limit: 0,
            ..Default::default()
        };
        assert!(matches!(Inspector::new(config), Err(InspectError::Config(_))));
    }

    #[test]
    fn test_exit_code_for_side_failures() {
        let spawn = InspectError::SpawnFailed {
            command: "wc".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(exit_code_for(&spawn), 127);
        let exit = InspectError::NonZeroExit {
            command: "sh".into(),
            code: 4,
        };
        assert_eq!(exit_code_for(&exit), 4);
    }
}
