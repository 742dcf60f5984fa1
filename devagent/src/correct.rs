//! Bounded run → fix → retry loop over the project's entry point.
//!
//! At most `max_attempts` executions and `max_attempts - 1` fix requests. The
//! loop always ends in a terminal [`CorrectionState`]; it never returns an error.

use std::fs;
use std::path::Path;
use std::thread;

use anyhow::{Context, anyhow};
use tracing::{debug, info, warn};

use crate::core::extract::extract_code;
use crate::core::types::{AbortCause, CorrectionAttempt, CorrectionState, Event};
use crate::io::config::CorrectionConfig;
use crate::io::events::EventSink;
use crate::io::inference::Inference;
use crate::io::process::{ProcessRunner, RunOutcome};
use crate::io::prompt::PromptEngine;
use crate::validate::EntryPoint;

pub struct SelfCorrector<'a, I: Inference, R: ProcessRunner> {
    inference: &'a I,
    prompts: &'a PromptEngine,
    model: &'a str,
    runner: &'a R,
    settings: &'a CorrectionConfig,
    sink: &'a dyn EventSink,
}

impl<'a, I: Inference, R: ProcessRunner> SelfCorrector<'a, I, R> {
    pub fn new(
        inference: &'a I,
        prompts: &'a PromptEngine,
        model: &'a str,
        runner: &'a R,
        settings: &'a CorrectionConfig,
        sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            inference,
            prompts,
            model,
            runner,
            settings,
            sink,
        }
    }

    /// Drive the loop for `entry` inside `project_root` until a terminal state.
    pub fn run(&self, project_root: &Path, entry: &EntryPoint) -> CorrectionState {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut state = CorrectionState::Running { attempt: 1 };
        while let CorrectionState::Running { attempt } = state {
            state = self.attempt(project_root, entry, attempt, max_attempts);
        }
        info!(?state, "correction finished");
        self.sink.emit(Event::CorrectionFinished(state.clone()));
        state
    }

    fn attempt(
        &self,
        project_root: &Path,
        entry: &EntryPoint,
        attempt: u32,
        max_attempts: u32,
    ) -> CorrectionState {
        self.sink.emit(Event::AttemptStarted {
            attempt,
            max_attempts,
        });

        let outcome = match self
            .runner
            .run(&entry.command, project_root, self.settings.run_timeout())
        {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(attempt, err = %format!("{err:#}"), "entry point could not be started");
                return CorrectionState::Aborted {
                    attempts: attempt,
                    cause: AbortCause::Launch,
                    reason: format!("{err:#}"),
                };
            }
        };

        let (code, stdout, stderr) = match outcome {
            RunOutcome::TimedOut => {
                return CorrectionState::Success {
                    attempts: attempt,
                    stdout: String::new(),
                    timed_out: true,
                };
            }
            RunOutcome::Exited {
                code: Some(0),
                stdout,
                ..
            } => {
                return CorrectionState::Success {
                    attempts: attempt,
                    stdout,
                    timed_out: false,
                };
            }
            RunOutcome::Exited {
                code,
                stdout,
                stderr,
            } => (code, stdout, stderr),
        };

        let error = if stderr.trim().is_empty() {
            stdout
        } else {
            stderr
        };
        self.sink.emit(Event::AttemptFailed {
            attempt,
            exit_code: code,
            error: error.clone(),
        });

        if attempt >= max_attempts {
            return CorrectionState::Failed {
                attempts: attempt,
                last_error: error,
            };
        }

        match self.apply_fix(project_root, entry, attempt, &error) {
            Ok(()) => {
                thread::sleep(self.settings.backoff());
                CorrectionState::Running {
                    attempt: attempt + 1,
                }
            }
            Err((cause, err)) => {
                warn!(attempt, ?cause, err = %format!("{err:#}"), "fix could not be applied");
                CorrectionState::Aborted {
                    attempts: attempt,
                    cause,
                    reason: format!("{err:#}"),
                }
            }
        }
    }

    /// Ask the executor model for a full replacement of the entry file and write it.
    fn apply_fix(
        &self,
        project_root: &Path,
        entry: &EntryPoint,
        attempt: u32,
        error: &str,
    ) -> Result<(), (AbortCause, anyhow::Error)> {
        let path = project_root.join(&entry.file);
        let current = fs::read_to_string(&path)
            .with_context(|| format!("read {}", path.display()))
            .map_err(|err| (AbortCause::EntryFile, err))?;
        let instruction = self
            .prompts
            .render_fix(&entry.file, error, &current)
            .map_err(|err| (AbortCause::FixReply, err))?;
        let reply = self
            .inference
            .infer(self.model, &instruction)
            .context("request fix from executor model")
            .map_err(|err| (AbortCause::FixReply, err))?;
        let patched = extract_code(&reply);
        if patched.is_empty() {
            return Err((
                AbortCause::FixReply,
                anyhow!("executor model returned an empty fix"),
            ));
        }
        fs::write(&path, &patched)
            .with_context(|| format!("write {}", path.display()))
            .map_err(|err| (AbortCause::EntryFile, err))?;
        debug!(attempt, bytes = patched.len(), "fix written");
        self.sink.emit(Event::FixApplied(CorrectionAttempt {
            attempt_number: attempt,
            captured_error: error.to_string(),
            patched_content: patched,
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entry::Framework;
    use crate::test_support::{
        RecordingSink, ScriptedInference, ScriptedProcessRunner, exited, temp_project,
    };

    fn settings(max_attempts: u32) -> CorrectionConfig {
        CorrectionConfig {
            max_attempts,
            run_timeout_secs: 15,
            backoff_ms: 0,
        }
    }

    fn entry() -> EntryPoint {
        EntryPoint {
            file: "app.py".to_string(),
            framework: Framework::Script,
            command: vec!["python".to_string(), "app.py".to_string()],
        }
    }

    fn project() -> tempfile::TempDir {
        temp_project(&[("app.py", "print(undefined)")]).expect("project")
    }

    #[test]
    fn always_failing_command_exhausts_attempts() {
        let temp = project();
        let runner = ScriptedProcessRunner::new(vec![
            exited(1, "", "NameError: one"),
            exited(1, "", "NameError: two"),
            exited(1, "", "NameError: three"),
        ]);
        let inference = ScriptedInference::replying(&["print(1)", "print(2)"]);
        let prompts = PromptEngine::new().expect("engine");
        let sink = RecordingSink::new();
        let cfg = settings(3);
        let corrector = SelfCorrector::new(&inference, &prompts, "coder", &runner, &cfg, &sink);

        let state = corrector.run(temp.path(), &entry());

        assert_eq!(
            state,
            CorrectionState::Failed {
                attempts: 3,
                last_error: "NameError: three".to_string()
            }
        );
        assert_eq!(runner.calls().len(), 3);
        assert_eq!(inference.calls().len(), 2);
        assert_eq!(sink.count(|e| matches!(e, Event::FixApplied(_))), 2);
        assert_eq!(
            fs::read_to_string(temp.path().join("app.py")).expect("read"),
            "print(2)"
        );
    }

    #[test]
    fn zero_exit_on_first_attempt_needs_no_fix() {
        let temp = project();
        let runner = ScriptedProcessRunner::new(vec![exited(0, "hello\n", "")]);
        let inference = ScriptedInference::replying(&[]);
        let prompts = PromptEngine::new().expect("engine");
        let sink = RecordingSink::new();
        let cfg = settings(3);
        let corrector = SelfCorrector::new(&inference, &prompts, "coder", &runner, &cfg, &sink);

        let state = corrector.run(temp.path(), &entry());

        assert_eq!(
            state,
            CorrectionState::Success {
                attempts: 1,
                stdout: "hello\n".to_string(),
                timed_out: false
            }
        );
        assert_eq!(runner.calls().len(), 1);
        assert_eq!(runner.calls()[0].workdir, temp.path());
        assert!(inference.calls().is_empty());
    }

    #[test]
    fn timeout_counts_as_running_service() {
        let temp = project();
        let runner = ScriptedProcessRunner::new(vec![RunOutcome::TimedOut]);
        let inference = ScriptedInference::replying(&[]);
        let prompts = PromptEngine::new().expect("engine");
        let sink = RecordingSink::new();
        let cfg = settings(3);
        let corrector = SelfCorrector::new(&inference, &prompts, "coder", &runner, &cfg, &sink);

        let state = corrector.run(temp.path(), &entry());

        assert!(matches!(
            state,
            CorrectionState::Success {
                attempts: 1,
                timed_out: true,
                ..
            }
        ));
        assert_eq!(runner.calls().len(), 1);
        assert_eq!(runner.calls()[0].timeout, cfg.run_timeout());
    }

    #[test]
    fn fix_then_success_on_second_attempt() {
        let temp = project();
        let runner = ScriptedProcessRunner::new(vec![
            exited(1, "Traceback: from stdout", "  "),
            exited(0, "", ""),
        ]);
        let inference = ScriptedInference::replying(&["```python\nprint('fixed')\n```"]);
        let prompts = PromptEngine::new().expect("engine");
        let sink = RecordingSink::new();
        let cfg = settings(3);
        let corrector = SelfCorrector::new(&inference, &prompts, "coder", &runner, &cfg, &sink);

        let state = corrector.run(temp.path(), &entry());

        assert!(matches!(state, CorrectionState::Success { attempts: 2, .. }));
        let prompt = &inference.calls()[0].prompt;
        assert!(prompt.contains("Traceback: from stdout"));
        assert!(prompt.contains("print(undefined)"));
        assert!(sink.events().contains(&Event::FixApplied(CorrectionAttempt {
            attempt_number: 1,
            captured_error: "Traceback: from stdout".to_string(),
            patched_content: "print('fixed')".to_string(),
        })));
    }

    #[test]
    fn empty_fix_aborts() {
        let temp = project();
        let runner = ScriptedProcessRunner::new(vec![exited(1, "", "boom")]);
        let inference = ScriptedInference::replying(&["```\n```"]);
        let prompts = PromptEngine::new().expect("engine");
        let sink = RecordingSink::new();
        let cfg = settings(3);
        let corrector = SelfCorrector::new(&inference, &prompts, "coder", &runner, &cfg, &sink);

        let state = corrector.run(temp.path(), &entry());

        assert!(matches!(
            state,
            CorrectionState::Aborted {
                attempts: 1,
                cause: AbortCause::FixReply,
                ..
            }
        ));
        assert_eq!(runner.calls().len(), 1);
        assert_eq!(
            fs::read_to_string(temp.path().join("app.py")).expect("read"),
            "print(undefined)"
        );
    }

    #[test]
    fn spawn_failure_aborts() {
        let temp = project();
        let runner =
            ScriptedProcessRunner::with_results(vec![Err("program not found".to_string())]);
        let inference = ScriptedInference::replying(&[]);
        let prompts = PromptEngine::new().expect("engine");
        let sink = RecordingSink::new();
        let cfg = settings(3);
        let corrector = SelfCorrector::new(&inference, &prompts, "coder", &runner, &cfg, &sink);

        let state = corrector.run(temp.path(), &entry());

        let CorrectionState::Aborted { cause, reason, .. } = &state else {
            panic!("expected aborted, got {state:?}");
        };
        assert_eq!(*cause, AbortCause::Launch);
        assert!(reason.contains("program not found"));
        assert!(inference.calls().is_empty());
        assert_eq!(
            sink.events().last(),
            Some(&Event::CorrectionFinished(state.clone()))
        );
    }

    #[test]
    fn missing_entry_file_aborts_without_asking_for_a_fix() {
        let temp = temp_project(&[("main.py", "print(1)")]).expect("project");
        let runner = ScriptedProcessRunner::new(vec![exited(1, "", "boom")]);
        let inference = ScriptedInference::replying(&["print(2)"]);
        let prompts = PromptEngine::new().expect("engine");
        let sink = RecordingSink::new();
        let cfg = settings(3);
        let corrector = SelfCorrector::new(&inference, &prompts, "coder", &runner, &cfg, &sink);

        let state = corrector.run(temp.path(), &entry());

        assert!(matches!(
            state,
            CorrectionState::Aborted {
                cause: AbortCause::EntryFile,
                ..
            }
        ));
        assert!(inference.calls().is_empty());
    }

    #[test]
    fn single_attempt_budget_never_requests_a_fix() {
        let temp = project();
        let runner = ScriptedProcessRunner::new(vec![exited(2, "", "bad")]);
        let inference = ScriptedInference::replying(&["print(1)"]);
        let prompts = PromptEngine::new().expect("engine");
        let sink = RecordingSink::new();
        let cfg = settings(1);
        let corrector = SelfCorrector::new(&inference, &prompts, "coder", &runner, &cfg, &sink);

        let state = corrector.run(temp.path(), &entry());

        assert!(matches!(state, CorrectionState::Failed { attempts: 1, .. }));
        assert!(inference.calls().is_empty());
    }
}
