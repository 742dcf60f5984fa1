//! Test-only scripted collaborators.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::core::types::Event;
use crate::io::events::EventSink;
use crate::io::inference::{Inference, InferenceError};
use crate::io::installer::{DependencyInstaller, InstallerFailure};
use crate::io::process::{ProcessRunner, RunOutcome};

/// One recorded inference call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceCall {
    pub model: String,
    pub prompt: String,
}

/// Replays queued replies in order and records every request.
///
/// Once the queue is empty, further calls fail with `ServiceUnreachable`.
#[derive(Debug, Default)]
pub struct ScriptedInference {
    replies: RefCell<VecDeque<Result<String, InferenceError>>>,
    calls: RefCell<Vec<InferenceCall>>,
}

impl ScriptedInference {
    pub fn new(replies: Vec<Result<String, InferenceError>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Shorthand for a script of successful replies.
    pub fn replying(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn calls(&self) -> Vec<InferenceCall> {
        self.calls.borrow().clone()
    }

    pub fn calls_to(&self, model: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.model == model).count()
    }
}

impl Inference for ScriptedInference {
    fn infer(&self, model: &str, prompt: &str) -> Result<String, InferenceError> {
        self.calls.borrow_mut().push(InferenceCall {
            model: model.to_string(),
            prompt: prompt.to_string(),
        });
        self.replies.borrow_mut().pop_front().unwrap_or_else(|| {
            Err(InferenceError::ServiceUnreachable(
                "scripted inference exhausted".to_string(),
            ))
        })
    }
}

/// One recorded process execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRun {
    pub command: Vec<String>,
    pub workdir: PathBuf,
    pub timeout: Duration,
}

/// Replays queued outcomes in order and records every command.
#[derive(Debug, Default)]
pub struct ScriptedProcessRunner {
    outcomes: RefCell<VecDeque<Result<RunOutcome, String>>>,
    calls: RefCell<Vec<RecordedRun>>,
}

impl ScriptedProcessRunner {
    pub fn new(outcomes: Vec<RunOutcome>) -> Self {
        Self::with_results(outcomes.into_iter().map(Ok).collect())
    }

    /// Script that may include spawn failures (`Err`).
    pub fn with_results(outcomes: Vec<Result<RunOutcome, String>>) -> Self {
        Self {
            outcomes: RefCell::new(outcomes.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedRun> {
        self.calls.borrow().clone()
    }
}

impl ProcessRunner for ScriptedProcessRunner {
    fn run(&self, command: &[String], workdir: &Path, timeout: Duration) -> Result<RunOutcome> {
        self.calls.borrow_mut().push(RecordedRun {
            command: command.to_vec(),
            workdir: workdir.to_path_buf(),
            timeout,
        });
        match self.outcomes.borrow_mut().pop_front() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted process runner exhausted")),
        }
    }
}

/// Build an `Exited` outcome with the given code and stderr.
pub fn exited(code: i32, stdout: &str, stderr: &str) -> RunOutcome {
    RunOutcome::Exited {
        code: Some(code),
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    }
}

/// Installer that records requested files and optionally fails.
#[derive(Debug, Default)]
pub struct ScriptedInstaller {
    failure: Option<String>,
    installed: RefCell<Vec<PathBuf>>,
}

impl ScriptedInstaller {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing(stderr: &str) -> Self {
        Self {
            failure: Some(stderr.to_string()),
            installed: RefCell::new(Vec::new()),
        }
    }

    pub fn installed(&self) -> Vec<PathBuf> {
        self.installed.borrow().clone()
    }
}

impl DependencyInstaller for ScriptedInstaller {
    fn install_from(&self, requirements: &Path) -> Result<()> {
        self.installed.borrow_mut().push(requirements.to_path_buf());
        match &self.failure {
            Some(stderr) => Err(InstallerFailure {
                requirements: requirements.display().to_string(),
                stderr: stderr.clone(),
            }
            .into()),
            None => Ok(()),
        }
    }
}

/// Captures emitted events for assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RefCell<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Count events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| predicate(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

/// Temp directory pre-populated with `(relative path, contents)` files.
pub fn temp_project(files: &[(&str, &str)]) -> Result<TempDir> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    for (relative, contents) in files {
        let path = dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    }
    Ok(dir)
}
