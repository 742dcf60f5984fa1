//! Shared deterministic types for the generation pipeline.
//!
//! Events are the product-facing narrative of a run; they are emitted through
//! [`crate::io::events::EventSink`] and never printed directly by components.

use std::fmt;
use std::path::PathBuf;

/// Self-correction loop state.
///
/// Every variant except `Running` is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectionState {
    Running {
        attempt: u32,
    },
    /// The entry point exited zero, or outlived the timeout and is assumed to be serving.
    Success {
        attempts: u32,
        stdout: String,
        timed_out: bool,
    },
    /// Every attempt exited non-zero.
    Failed {
        attempts: u32,
        last_error: String,
    },
    /// The loop could not continue; `cause` says which step broke.
    Aborted {
        attempts: u32,
        cause: AbortCause,
        reason: String,
    },
}

/// Why the correction loop stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortCause {
    /// The run command could not be started.
    Launch,
    /// The entry file could not be read or rewritten.
    EntryFile,
    /// The fix request failed or came back empty.
    FixReply,
}

impl CorrectionState {
    pub fn is_success(&self) -> bool {
        matches!(self, CorrectionState::Success { .. })
    }
}

/// One applied fix inside the correction loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionAttempt {
    pub attempt_number: u32,
    pub captured_error: String,
    pub patched_content: String,
}

/// Structured progress events emitted by pipeline components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ProjectStarted {
        prompt: String,
    },
    PlanRequested,
    PlanRepairRequested {
        parse_error: String,
    },
    PlanReceived {
        project_name: String,
        steps: usize,
    },
    StepStarted {
        index: usize,
        total: usize,
        label: String,
    },
    DirectoryCreated {
        path: String,
    },
    FileWritten {
        path: String,
        bytes: usize,
    },
    RequirementsWritten {
        count: usize,
    },
    ContextTruncated {
        path: String,
        cap_chars: usize,
    },
    /// A step failed locally and was skipped; the run continues.
    StepSkipped {
        index: usize,
        kind: &'static str,
        reason: String,
    },
    DependenciesInstalled,
    ValidationSkipped {
        reason: String,
    },
    RunCommandSelected {
        entry_file: String,
        framework: &'static str,
        command: Vec<String>,
    },
    AttemptStarted {
        attempt: u32,
        max_attempts: u32,
    },
    AttemptFailed {
        attempt: u32,
        exit_code: Option<i32>,
        error: String,
    },
    FixApplied(CorrectionAttempt),
    CorrectionFinished(CorrectionState),
    DocsWritten {
        path: PathBuf,
    },
    DocsFailed {
        reason: String,
    },
    ProjectFinished {
        project_root: PathBuf,
    },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::ProjectStarted { prompt } => write!(f, "Starting new project: '{prompt}'"),
            Event::PlanRequested => write!(f, "Thinking... creating a multi-step plan"),
            Event::PlanRepairRequested { parse_error } => write!(
                f,
                "Planner JSON invalid ({parse_error}), attempting auto-repair..."
            ),
            Event::PlanReceived {
                project_name,
                steps,
            } => write!(
                f,
                "Plan received for project '{project_name}' ({steps} steps)."
            ),
            Event::StepStarted {
                index,
                total,
                label,
            } => write!(f, "-> Executing step {index}/{total}: {label}"),
            Event::DirectoryCreated { path } => write!(f, "Created directory: {path}"),
            Event::FileWritten { path, bytes } => {
                write!(f, "Wrote code to: {path} ({bytes} bytes)")
            }
            Event::RequirementsWritten { count } => write!(
                f,
                "Created requirements.txt with {count} dependencies."
            ),
            Event::ContextTruncated { path, cap_chars } => write!(
                f,
                "Context for {path} truncated to the last {cap_chars} characters."
            ),
            Event::StepSkipped {
                index,
                kind,
                reason,
            } => write!(f, "Skipped step {index} ({kind}): {reason}"),
            Event::DependenciesInstalled => write!(f, "Dependencies installed successfully."),
            Event::ValidationSkipped { reason } => write!(f, "Validation skipped: {reason}"),
            Event::RunCommandSelected {
                entry_file,
                framework,
                command,
            } => write!(
                f,
                "Entry point {entry_file} ({framework}): {}",
                command.join(" ")
            ),
            Event::AttemptStarted {
                attempt,
                max_attempts,
            } => write!(f, "Attempt {attempt}/{max_attempts}: running the app..."),
            Event::AttemptFailed {
                attempt,
                exit_code,
                error,
            } => {
                let code = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                write!(
                    f,
                    "Attempt {attempt} failed (exit {code}). Error:\n{}",
                    error.trim_end()
                )
            }
            Event::FixApplied(attempt) => write!(
                f,
                "Fix applied after attempt {} ({} bytes). Retrying...",
                attempt.attempt_number,
                attempt.patched_content.len()
            ),
            Event::CorrectionFinished(state) => match state {
                CorrectionState::Success {
                    timed_out: true, ..
                } => write!(
                    f,
                    "App run timed out. Assuming it's a running server, marking as success."
                ),
                CorrectionState::Success { stdout, .. } => {
                    write!(f, "App ran successfully without errors!")?;
                    if !stdout.trim().is_empty() {
                        write!(f, "\nOutput:\n{}", stdout.trim_end())?;
                    }
                    Ok(())
                }
                CorrectionState::Failed { attempts, .. } => {
                    write!(f, "Could not fix the app after {attempts} attempts.")
                }
                CorrectionState::Aborted { cause, reason, .. } => match cause {
                    AbortCause::Launch => {
                        write!(f, "Could not start the app: {reason}. Aborting.")
                    }
                    AbortCause::EntryFile => {
                        write!(f, "Could not update the entry file: {reason}. Aborting.")
                    }
                    AbortCause::FixReply => {
                        write!(f, "Could not generate a fix: {reason}. Aborting.")
                    }
                },
                CorrectionState::Running { attempt } => {
                    write!(f, "Correction still running at attempt {attempt}")
                }
            },
            Event::DocsWritten { path } => {
                write!(f, "{} generated successfully.", path.display())
            }
            Event::DocsFailed { reason } => write!(f, "Error writing README.md: {reason}"),
            Event::ProjectFinished { project_root } => write!(
                f,
                "Project scaffolding finished in {}.",
                project_root.display()
            ),
        }
    }
}
