//! "New project from prompt": plan, execute, validate, correct, document.
//!
//! Fatal failures (plan, install) leave already-written files on disk; there is
//! no rollback.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};

use crate::core::types::{CorrectionState, Event};
use crate::correct::SelfCorrector;
use crate::execute::{ExecutionReport, ProjectExecutor};
use crate::io::config::AgentConfig;
use crate::io::docs::write_readme;
use crate::io::events::EventSink;
use crate::io::inference::Inference;
use crate::io::installer::DependencyInstaller;
use crate::io::process::ProcessRunner;
use crate::io::prompt::PromptEngine;
use crate::plan::ProjectPlan;
use crate::planner::PromptPlanner;
use crate::validate::{EntryPoint, ValidationRunner};

/// External collaborators for one pipeline run.
pub struct Collaborators<'a, I: Inference, R: ProcessRunner, D: DependencyInstaller> {
    pub inference: &'a I,
    pub runner: &'a R,
    pub installer: &'a D,
    pub sink: &'a dyn EventSink,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub plan: ProjectPlan,
    pub execution: ExecutionReport,
    /// `None` when no entry point was found.
    pub entry_point: Option<EntryPoint>,
    /// `None` when validation was skipped.
    pub correction: Option<CorrectionState>,
    pub readme: Option<PathBuf>,
}

impl PipelineOutcome {
    pub fn project_root(&self) -> &Path {
        &self.execution.project_root
    }

    /// True unless the correction loop ran and ended without success.
    pub fn succeeded(&self) -> bool {
        self.correction
            .as_ref()
            .is_none_or(CorrectionState::is_success)
    }
}

/// Generate one project for `prompt` under `base_dir`.
pub fn new_project<I, R, D>(
    prompt: &str,
    base_dir: &Path,
    cfg: &AgentConfig,
    collaborators: &Collaborators<'_, I, R, D>,
) -> Result<PipelineOutcome>
where
    I: Inference,
    R: ProcessRunner,
    D: DependencyInstaller,
{
    let sink = collaborators.sink;
    let prompts = PromptEngine::new()?;
    sink.emit(Event::ProjectStarted {
        prompt: prompt.trim().to_string(),
    });

    let planner = PromptPlanner::new(
        collaborators.inference,
        &prompts,
        &cfg.inference.planner_model,
        sink,
    );
    let plan = planner.plan(prompt)?;

    let executor = ProjectExecutor::new(
        collaborators.inference,
        &prompts,
        &cfg.inference.executor_model,
        cfg.generation.context_cap_chars,
        sink,
    );
    let execution = executor.execute(&plan, prompt, base_dir)?;
    let project_root = execution.project_root.clone();

    let validation = ValidationRunner::new(collaborators.installer, &cfg.validation.python, sink);
    let entry_point = validation.prepare(&project_root)?;

    let correction = entry_point.as_ref().map(|entry| {
        SelfCorrector::new(
            collaborators.inference,
            &prompts,
            &cfg.inference.executor_model,
            collaborators.runner,
            &cfg.correction,
            sink,
        )
        .run(&project_root, entry)
    });

    let readme = match write_readme(&project_root, &plan.project_name, prompt) {
        Ok(path) => {
            sink.emit(Event::DocsWritten { path: path.clone() });
            Some(path)
        }
        Err(err) => {
            warn!(err = %format!("{err:#}"), "readme generation failed");
            sink.emit(Event::DocsFailed {
                reason: format!("{err:#}"),
            });
            None
        }
    };

    info!(root = %project_root.display(), "project finished");
    sink.emit(Event::ProjectFinished {
        project_root: project_root.clone(),
    });

    Ok(PipelineOutcome {
        plan,
        execution,
        entry_point,
        correction,
        readme,
    })
}
