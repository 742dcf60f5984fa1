//! Agent configuration stored in `devagent.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::context::DEFAULT_CONTEXT_CAP_CHARS;

/// Default config file name, resolved against the current directory.
pub const CONFIG_FILE: &str = "devagent.toml";

/// Agent configuration (TOML).
///
/// Missing sections and fields fall back to the defaults below, so an empty
/// file is a valid config.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    pub inference: InferenceConfig,
    pub generation: GenerationConfig,
    pub validation: ValidationConfig,
    pub correction: CorrectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InferenceConfig {
    /// Base URL of the Ollama server.
    pub endpoint: String,
    /// Model that produces the build plan.
    pub planner_model: String,
    /// Model that writes and fixes file contents.
    pub executor_model: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            planner_model: "mistral:7b-instruct".to_string(),
            executor_model: "deepseek-coder:6.7b".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Cap on dependency context passed to a single generation call.
    pub context_cap_chars: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            context_cap_chars: DEFAULT_CONTEXT_CAP_CHARS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ValidationConfig {
    /// Interpreter used for plain script entry points.
    pub python: String,
    /// Installer program invoked as `<pip> install -r requirements.txt`.
    pub pip: String,
    pub install_timeout_secs: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            python: "python".to_string(),
            pip: "pip".to_string(),
            install_timeout_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Total executions of the entry point, including the first run.
    pub max_attempts: u32,
    /// Wall-clock bound per execution; outliving it counts as a running service.
    pub run_timeout_secs: u64,
    /// Pause between applying a fix and the next execution.
    pub backoff_ms: u64,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            run_timeout_secs: 15,
            backoff_ms: 2_000,
        }
    }
}

impl CorrectionConfig {
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.inference.endpoint.trim().is_empty() {
            return Err(anyhow!("inference.endpoint must be non-empty"));
        }
        if self.inference.planner_model.trim().is_empty() {
            return Err(anyhow!("inference.planner_model must be non-empty"));
        }
        if self.inference.executor_model.trim().is_empty() {
            return Err(anyhow!("inference.executor_model must be non-empty"));
        }
        if self.inference.timeout_secs == 0 {
            return Err(anyhow!("inference.timeout_secs must be > 0"));
        }
        if self.generation.context_cap_chars == 0 {
            return Err(anyhow!("generation.context_cap_chars must be > 0"));
        }
        if self.validation.python.trim().is_empty() || self.validation.pip.trim().is_empty() {
            return Err(anyhow!("validation.python and validation.pip must be non-empty"));
        }
        if self.validation.install_timeout_secs == 0 {
            return Err(anyhow!("validation.install_timeout_secs must be > 0"));
        }
        if self.correction.max_attempts == 0 {
            return Err(anyhow!("correction.max_attempts must be >= 1"));
        }
        if self.correction.run_timeout_secs == 0 {
            return Err(anyhow!("correction.run_timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AgentConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
