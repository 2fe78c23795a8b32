//! Worker task tree.
//!
//! A [`WorkerTask`] owns a job and at most one nested task. Running a
//! task spawns its job on the tokio runtime, waits for it, then (only if
//! the job succeeded) runs the nested task the same way and reports its
//! status before folding it into its own. Each level is joined
//! explicitly; nothing outlives its parent.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{info, warn};

use crate::exec::CommandOutput;
use crate::output::Console;

/// Work performed by one level of the tree.
pub type Job = Pin<Box<dyn Future<Output = JobStatus> + Send + 'static>>;

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobStatus {
    /// OS process id when the job was a subprocess.
    pub pid: Option<u32>,
    pub code: i32,
    pub exited: bool,
    pub signal: Option<i32>,
}

impl JobStatus {
    pub fn exited(code: i32) -> Self {
        Self {
            pid: None,
            code,
            exited: true,
            signal: None,
        }
    }

    pub fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }

    /// Status of a finished subprocess.
    pub fn from_output(output: &CommandOutput) -> Self {
        Self::from_process(output.pid, output.code, output.signal)
    }

    /// Status from a process's pid, exit code and terminating signal.
    pub fn from_process(pid: Option<u32>, code: Option<i32>, signal: Option<i32>) -> Self {
        match code {
            Some(code) => Self::exited(code).with_pid(pid),
            None => Self {
                pid,
                code: signal.map(|s| 128 + s).unwrap_or(1),
                exited: false,
                signal,
            },
        }
    }

    fn folded_code(&self) -> i32 {
        if self.exited {
            self.code
        } else {
            self.signal.map(|s| 128 + s).unwrap_or(self.code)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a joined worker, with its nested worker's status folded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildResult {
    pub worker: WorkerId,
    pub label: String,
    pub pid: Option<u32>,
    pub exit_code: i32,
    /// `false` when the worker panicked or its process was killed by a signal.
    pub exited: bool,
    pub signal: Option<i32>,
    pub nested: Option<Box<ChildResult>>,
}

impl ChildResult {
    /// Line printed once the worker has been joined.
    pub fn status_line(&self) -> String {
        let pid = self
            .pid
            .map(|pid| format!(", pid {pid}"))
            .unwrap_or_default();
        if self.exited {
            format!(
                "Worker {} ({}{}) exited with code {}",
                self.worker, self.label, pid, self.exit_code
            )
        } else {
            let signal = self
                .signal
                .map(|s| format!(" by signal {s}"))
                .unwrap_or_default();
            format!(
                "Worker {} ({}{}) terminated abnormally{}",
                self.worker, self.label, pid, signal
            )
        }
    }

    /// Code this result contributes to its parent.
    fn folded_code(&self) -> i32 {
        if self.exited {
            self.exit_code
        } else {
            self.signal.map(|s| 128 + s).unwrap_or(1)
        }
    }
}

/// A node of the tree: one job plus an optional nested task.
pub struct WorkerTask {
    label: String,
    job: Job,
    nested: Option<Box<WorkerTask>>,
}

impl WorkerTask {
    pub fn new<F>(label: impl Into<String>, job: F) -> Self
    where
        F: Future<Output = JobStatus> + Send + 'static,
    {
        Self {
            label: label.into(),
            job: Box::pin(job),
            nested: None,
        }
    }

    /// Run `nested` after this task's job succeeds.
    pub fn then(mut self, nested: WorkerTask) -> Self {
        self.nested = Some(Box::new(nested));
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Spawns worker tasks and hands out their ids.
#[derive(Clone)]
pub struct Supervisor {
    console: Console,
    next_id: Arc<AtomicU64>,
}

impl Supervisor {
    pub fn new(console: Console) -> Self {
        Self {
            console,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Spawn `task`, wait for it and its nested task, and return the
    /// folded result. The nested status line is printed by this call;
    /// the caller prints the returned one.
    pub fn run(&self, task: WorkerTask) -> Pin<Box<dyn Future<Output = ChildResult> + Send + 'static>> {
        let supervisor = self.clone();
        Box::pin(async move {
            let worker = WorkerId(supervisor.next_id.fetch_add(1, Ordering::Relaxed));
            let WorkerTask { label, job, nested } = task;

            let inner = supervisor.clone();
            let handle = tokio::spawn(async move {
                let status = job.await;
                if !status.exited || status.code != 0 {
                    return (status, None);
                }
                match nested {
                    Some(nested) => {
                        let child = inner.run(*nested).await;
                        inner.console.line(child.status_line());
                        let folded = JobStatus {
                            code: child.folded_code(),
                            ..status
                        };
                        (folded, Some(Box::new(child)))
                    }
                    None => (status, None),
                }
            });

            let result = match handle.await {
                Ok((status, nested)) => ChildResult {
                    worker,
                    label,
                    pid: status.pid,
                    exit_code: status.folded_code(),
                    exited: status.exited,
                    signal: status.signal,
                    nested,
                },
                Err(e) => {
                    warn!(worker = %worker, error = %e, "worker did not complete");
                    ChildResult {
                        worker,
                        label,
                        pid: None,
                        exit_code: 1,
                        exited: false,
                        signal: None,
                        nested: None,
                    }
                }
            };
            info!(worker = %worker, label = %result.label, code = result.exit_code, exited = result.exited, "worker joined");
            result
        })
    }
}
