//! Dependency installer adapter for `pip install -r`.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{info, instrument};

use crate::io::process::{ProcessRunner, RunOutcome};

/// Installing declared dependencies failed; fatal to the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerFailure {
    pub requirements: String,
    pub stderr: String,
}

impl fmt::Display for InstallerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dependency installation from {} failed:\n{}",
            self.requirements,
            self.stderr.trim_end()
        )
    }
}

impl std::error::Error for InstallerFailure {}

pub trait DependencyInstaller {
    /// Install every specifier listed in `requirements`.
    ///
    /// Failures surface as [`InstallerFailure`] inside the returned error.
    fn install_from(&self, requirements: &Path) -> Result<()>;
}

/// Installs with `<pip> install -r <requirements>` in the requirements file's directory.
pub struct PipInstaller<'a, R: ProcessRunner> {
    runner: &'a R,
    pip: String,
    timeout: Duration,
}

impl<'a, R: ProcessRunner> PipInstaller<'a, R> {
    pub fn new(runner: &'a R, pip: impl Into<String>, timeout: Duration) -> Self {
        Self {
            runner,
            pip: pip.into(),
            timeout,
        }
    }
}

impl<R: ProcessRunner> DependencyInstaller for PipInstaller<'_, R> {
    #[instrument(skip_all, fields(requirements = %requirements.display()))]
    fn install_from(&self, requirements: &Path) -> Result<()> {
        let workdir = requirements
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let file_name = requirements
            .file_name()
            .ok_or_else(|| anyhow!("requirements path has no file name"))?
            .to_string_lossy()
            .into_owned();
        let command = vec![
            self.pip.clone(),
            "install".to_string(),
            "-r".to_string(),
            file_name,
        ];

        let failure = |stderr: String| InstallerFailure {
            requirements: requirements.display().to_string(),
            stderr,
        };
        let outcome = self
            .runner
            .run(&command, workdir, self.timeout)
            .map_err(|err| failure(format!("{err:#}")))?;
        match outcome {
            RunOutcome::Exited { code: Some(0), .. } => {
                info!("dependencies installed");
                Ok(())
            }
            RunOutcome::Exited { code, stderr, .. } => {
                let stderr = if stderr.trim().is_empty() {
                    format!("{} exited with {:?}", command.join(" "), code)
                } else {
                    stderr
                };
                Err(failure(stderr).into())
            }
            RunOutcome::TimedOut => {
                Err(failure(format!("installer timed out after {:?}", self.timeout)).into())
            }
        }
    }
}
