//! Step-by-step project generation.
//!
//! Steps run strictly in declared order because later `generate_file` steps
//! read earlier outputs through [`FileMemory`]. A failing step is reported and
//! skipped; only failing to create the project root aborts the run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, warn};

use crate::core::context::{FileMemory, assemble_context};
use crate::core::extract::extract_code;
use crate::core::types::Event;
use crate::io::events::EventSink;
use crate::io::inference::Inference;
use crate::io::project::{create_dir_in_root, create_project_root, write_in_root};
use crate::io::prompt::PromptEngine;
use crate::plan::{ProjectPlan, REQUIREMENTS_FILE, Step};

/// Specifier written when a requirements step lists nothing.
pub const DEFAULT_REQUIREMENT: &str = "flask==2.0.1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedStep {
    /// 1-based position in the plan.
    pub index: usize,
    pub kind: &'static str,
    pub reason: String,
}

/// What one execution pass produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub project_root: PathBuf,
    pub files_written: Vec<String>,
    pub directories_created: Vec<String>,
    pub steps_skipped: Vec<SkippedStep>,
}

pub struct ProjectExecutor<'a, I: Inference> {
    inference: &'a I,
    prompts: &'a PromptEngine,
    model: &'a str,
    context_cap_chars: usize,
    sink: &'a dyn EventSink,
}

impl<'a, I: Inference> ProjectExecutor<'a, I> {
    pub fn new(
        inference: &'a I,
        prompts: &'a PromptEngine,
        model: &'a str,
        context_cap_chars: usize,
        sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            inference,
            prompts,
            model,
            context_cap_chars,
            sink,
        }
    }

    /// Create `<base_dir>/<project_name>` and run every step of `plan` inside it.
    ///
    /// `overview` is the original request, shared by every generation call.
    pub fn execute(
        &self,
        plan: &ProjectPlan,
        overview: &str,
        base_dir: &Path,
    ) -> Result<ExecutionReport> {
        let project_root = create_project_root(base_dir, &plan.project_name)?;
        let mut memory = FileMemory::new();
        let mut report = ExecutionReport {
            project_root: project_root.clone(),
            files_written: Vec::new(),
            directories_created: Vec::new(),
            steps_skipped: Vec::new(),
        };

        let total = plan.steps.len();
        for (offset, step) in plan.steps.iter().enumerate() {
            let index = offset + 1;
            self.sink.emit(Event::StepStarted {
                index,
                total,
                label: step.label(),
            });

            let outcome = match step {
                Step::CreateDirectory { path } => {
                    self.create_directory(&project_root, path, &mut report)
                }
                Step::GenerateFile {
                    path,
                    prompt,
                    dependencies,
                    ..
                } => self.generate_file(
                    &project_root,
                    overview,
                    path,
                    prompt,
                    dependencies,
                    &mut memory,
                    &mut report,
                ),
                Step::CreateRequirementsFile { dependencies } => {
                    self.write_requirements(&project_root, dependencies, &mut report)
                }
                Step::Unknown { raw } => Err(anyhow!("unrecognized step: {raw}")),
            };

            if let Err(err) = outcome {
                let reason = format!("{err:#}");
                warn!(index, kind = step.kind(), reason = %reason, "step skipped");
                self.sink.emit(Event::StepSkipped {
                    index,
                    kind: step.kind(),
                    reason: reason.clone(),
                });
                report.steps_skipped.push(SkippedStep {
                    index,
                    kind: step.kind(),
                    reason,
                });
            }
        }

        debug!(
            files = report.files_written.len(),
            skipped = report.steps_skipped.len(),
            "execution finished"
        );
        Ok(report)
    }

    fn create_directory(
        &self,
        root: &Path,
        path: &str,
        report: &mut ExecutionReport,
    ) -> Result<()> {
        create_dir_in_root(root, path)?;
        self.sink.emit(Event::DirectoryCreated {
            path: path.to_string(),
        });
        report.directories_created.push(path.to_string());
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn generate_file(
        &self,
        root: &Path,
        overview: &str,
        path: &str,
        task: &str,
        dependencies: &[String],
        memory: &mut FileMemory,
        report: &mut ExecutionReport,
    ) -> Result<()> {
        let context = assemble_context(memory, dependencies, self.context_cap_chars);
        if !context.missing.is_empty() {
            debug!(path, missing = ?context.missing, "dependencies not in memory");
        }
        if context.truncated {
            self.sink.emit(Event::ContextTruncated {
                path: path.to_string(),
                cap_chars: self.context_cap_chars,
            });
        }

        let instruction = self
            .prompts
            .render_generate(overview, path, task, &context.text)?;
        let reply = self
            .inference
            .infer(self.model, &instruction)
            .with_context(|| format!("generate {path}"))?;
        let code = extract_code(&reply);
        if code.is_empty() {
            bail!("executor model returned no code for {path}");
        }

        write_in_root(root, path, &code)?;
        memory.record(path, &code);
        self.sink.emit(Event::FileWritten {
            path: path.to_string(),
            bytes: code.len(),
        });
        report.files_written.push(path.to_string());
        Ok(())
    }

    fn write_requirements(
        &self,
        root: &Path,
        dependencies: &[String],
        report: &mut ExecutionReport,
    ) -> Result<()> {
        let specifiers: Vec<&str> = if dependencies.is_empty() {
            vec![DEFAULT_REQUIREMENT]
        } else {
            dependencies.iter().map(String::as_str).collect()
        };
        let mut contents = specifiers.join("\n");
        contents.push('\n');
        write_in_root(root, REQUIREMENTS_FILE, &contents)?;
        self.sink.emit(Event::RequirementsWritten {
            count: specifiers.len(),
        });
        report.files_written.push(REQUIREMENTS_FILE.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;
    use crate::io::inference::InferenceError;
    use crate::test_support::{RecordingSink, ScriptedInference};

    fn generate(path: &str, dependencies: &[&str]) -> Step {
        Step::GenerateFile {
            path: path.to_string(),
            prompt: format!("write {path}"),
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            description: None,
        }
    }

    fn plan(steps: Vec<Step>) -> ProjectPlan {
        ProjectPlan {
            project_name: "demo".to_string(),
            steps,
        }
    }

    #[test]
    fn steps_run_in_order_and_feed_later_context() {
        let temp = tempfile::tempdir().expect("tempdir");
        let inference = ScriptedInference::replying(&[
            "```python\nHELPER = 1\n```",
            "```python\nfrom helper import HELPER\n```",
        ]);
        let prompts = PromptEngine::new().expect("engine");
        let sink = RecordingSink::new();
        let executor = ProjectExecutor::new(&inference, &prompts, "coder", 20_000, &sink);

        let report = executor
            .execute(
                &plan(vec![
                    Step::CreateDirectory {
                        path: "static".to_string(),
                    },
                    generate("helper.py", &[]),
                    generate("app.py", &["helper.py", "missing.py"]),
                ]),
                "a demo app",
                temp.path(),
            )
            .expect("execute");

        let root = temp.path().join("demo");
        assert_eq!(report.project_root, root);
        assert!(root.join("static").is_dir());
        assert_eq!(
            fs::read_to_string(root.join("helper.py")).expect("read"),
            "HELPER = 1"
        );
        assert_eq!(report.files_written, vec!["helper.py", "app.py"]);
        assert_eq!(report.directories_created, vec!["static"]);
        assert!(report.steps_skipped.is_empty());

        let calls = inference.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].prompt.contains("a demo app"));
        assert!(calls[1].prompt.contains("Content of helper.py:\nHELPER = 1"));
        assert!(!calls[1].prompt.contains("Content of missing.py"));
    }

    #[test]
    fn failed_generation_is_skipped_without_memory_entry() {
        let temp = tempfile::tempdir().expect("tempdir");
        let inference = ScriptedInference::new(vec![
            Err(InferenceError::EmptyResponse),
            Ok("```\n```".to_string()),
            Ok("print('ok')".to_string()),
        ]);
        let prompts = PromptEngine::new().expect("engine");
        let sink = RecordingSink::new();
        let executor = ProjectExecutor::new(&inference, &prompts, "coder", 20_000, &sink);

        let report = executor
            .execute(
                &plan(vec![
                    generate("a.py", &[]),
                    generate("b.py", &[]),
                    generate("main.py", &["a.py", "b.py"]),
                ]),
                "x",
                temp.path(),
            )
            .expect("execute");

        let root = temp.path().join("demo");
        assert!(!root.join("a.py").exists());
        assert!(!root.join("b.py").exists());
        assert_eq!(report.files_written, vec!["main.py"]);
        let skipped: Vec<usize> = report.steps_skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![1, 2]);
        assert!(inference.calls()[2].prompt.contains("(none)"));
    }

    #[test]
    fn unknown_and_unsafe_steps_are_skipped_and_run_continues() {
        let temp = tempfile::tempdir().expect("tempdir");
        let inference = ScriptedInference::replying(&[]);
        let prompts = PromptEngine::new().expect("engine");
        let sink = RecordingSink::new();
        let executor = ProjectExecutor::new(&inference, &prompts, "coder", 20_000, &sink);

        let report = executor
            .execute(
                &plan(vec![
                    Step::Unknown {
                        raw: json!({"type": "run_shell"}),
                    },
                    Step::CreateDirectory {
                        path: "../escape".to_string(),
                    },
                    Step::CreateRequirementsFile {
                        dependencies: vec!["fastapi".to_string(), "uvicorn".to_string()],
                    },
                ]),
                "x",
                temp.path(),
            )
            .expect("execute");

        assert!(!temp.path().join("escape").exists());
        assert_eq!(report.steps_skipped.len(), 2);
        assert_eq!(report.steps_skipped[0].kind, "unknown");
        assert_eq!(report.steps_skipped[1].kind, "create_directory");
        assert_eq!(
            fs::read_to_string(temp.path().join("demo/requirements.txt")).expect("read"),
            "fastapi\nuvicorn\n"
        );
        assert_eq!(
            sink.count(|e| matches!(e, Event::StepSkipped { .. })),
            2
        );
    }

    #[test]
    fn empty_requirements_default_to_flask() {
        let temp = tempfile::tempdir().expect("tempdir");
        let inference = ScriptedInference::replying(&[]);
        let prompts = PromptEngine::new().expect("engine");
        let sink = RecordingSink::new();
        let executor = ProjectExecutor::new(&inference, &prompts, "coder", 20_000, &sink);

        executor
            .execute(
                &plan(vec![Step::CreateRequirementsFile {
                    dependencies: Vec::new(),
                }]),
                "x",
                temp.path(),
            )
            .expect("execute");

        assert_eq!(
            fs::read_to_string(temp.path().join("demo/requirements.txt")).expect("read"),
            "flask==2.0.1\n"
        );
        assert!(
            sink.events()
                .contains(&Event::RequirementsWritten { count: 1 })
        );
    }

    #[test]
    fn oversized_context_is_truncated_and_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        let big = "x".repeat(500);
        let inference = ScriptedInference::replying(&[big.as_str(), "print(1)"]);
        let prompts = PromptEngine::new().expect("engine");
        let sink = RecordingSink::new();
        let executor = ProjectExecutor::new(&inference, &prompts, "coder", 100, &sink);

        executor
            .execute(
                &plan(vec![generate("big.py", &[]), generate("app.py", &["big.py"])]),
                "x",
                temp.path(),
            )
            .expect("execute");

        assert!(sink.events().contains(&Event::ContextTruncated {
            path: "app.py".to_string(),
            cap_chars: 100,
        }));
        assert!(!inference.calls()[1].prompt.contains("Content of big.py"));
    }
}
