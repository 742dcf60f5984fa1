//! Validation setup: dependency install, entry-point detection, run-command selection.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::core::entry::{ENTRY_CANDIDATES, Framework, run_command};
use crate::core::types::Event;
use crate::io::events::EventSink;
use crate::io::installer::DependencyInstaller;
use crate::plan::REQUIREMENTS_FILE;

/// Entry file chosen for execution and the command that launches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// Path relative to the project root.
    pub file: String,
    pub framework: Framework,
    pub command: Vec<String>,
}

pub struct ValidationRunner<'a, D: DependencyInstaller> {
    installer: &'a D,
    python: &'a str,
    sink: &'a dyn EventSink,
}

impl<'a, D: DependencyInstaller> ValidationRunner<'a, D> {
    pub fn new(installer: &'a D, python: &'a str, sink: &'a dyn EventSink) -> Self {
        Self {
            installer,
            python,
            sink,
        }
    }

    /// Install dependencies, then locate the entry point.
    ///
    /// Returns `Ok(None)` when there is nothing to run. Installer failures are
    /// returned as errors and stop the run.
    pub fn prepare(&self, project_root: &Path) -> Result<Option<EntryPoint>> {
        self.install_dependencies(project_root)?;
        self.detect_entry_point(project_root)
    }

    fn install_dependencies(&self, project_root: &Path) -> Result<()> {
        let requirements = project_root.join(REQUIREMENTS_FILE);
        if !requirements.is_file() {
            debug!("no requirements file, skipping install");
            return Ok(());
        }
        self.installer
            .install_from(&requirements)
            .context("install project dependencies")?;
        info!("dependencies installed");
        self.sink.emit(Event::DependenciesInstalled);
        Ok(())
    }

    fn detect_entry_point(&self, project_root: &Path) -> Result<Option<EntryPoint>> {
        let Some(file) = ENTRY_CANDIDATES
            .iter()
            .find(|candidate| project_root.join(candidate).is_file())
        else {
            self.sink.emit(Event::ValidationSkipped {
                reason: format!("no {} found", ENTRY_CANDIDATES.join(" or ")),
            });
            return Ok(None);
        };

        let path = project_root.join(file);
        let content =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let framework = Framework::detect(&content);
        let command = run_command(framework, file, self.python);
        self.sink.emit(Event::RunCommandSelected {
            entry_file: file.to_string(),
            framework: framework.as_str(),
            command: command.clone(),
        });
        Ok(Some(EntryPoint {
            file: file.to_string(),
            framework,
            command,
        }))
    }
}
