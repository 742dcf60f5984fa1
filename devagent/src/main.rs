//! Local-model coding agent CLI.
//!
//! `devagent new <prompt>` scaffolds one project in the current directory;
//! `devagent` with no subcommand opens a prompt loop.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::debug;

use devagent::exit_codes;
use devagent::io::config::{AgentConfig, CONFIG_FILE, load_config, write_config};
use devagent::io::events::ConsoleSink;
use devagent::io::inference::{InferenceError, OllamaClient};
use devagent::io::installer::{InstallerFailure, PipInstaller};
use devagent::io::process::CommandRunner;
use devagent::logging;
use devagent::pipeline::{Collaborators, new_project};
use devagent::planner::PlanUnparseableError;
use devagent::repl::run_repl;

#[derive(Parser)]
#[command(
    name = "devagent",
    version,
    about = "Scaffold, run, and self-correct a project from a single prompt"
)]
struct Cli {
    /// Config file path.
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,
    /// Override `inference.planner_model`.
    #[arg(long, global = true)]
    planner_model: Option<String>,
    /// Override `inference.executor_model`.
    #[arg(long, global = true)]
    executor_model: Option<String>,
    /// Override `inference.endpoint`.
    #[arg(long, global = true)]
    endpoint: Option<String>,
    /// Without a subcommand, read prompts interactively.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate one project from a prompt.
    New {
        #[arg(required = true)]
        prompt: Vec<String>,
    },
    /// Write a default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match &cli.command {
        Some(Command::Init { force }) => cmd_init(&cli.config, *force),
        Some(Command::New { prompt }) => {
            let cfg = resolve_config(&cli)?;
            cmd_new(&prompt.join(" "), &cfg)
        }
        None => {
            let cfg = resolve_config(&cli)?;
            run_repl(|prompt| cmd_new(prompt, &cfg).map(|_| ()))?;
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &AgentConfig::default())?;
    println!("Wrote {}", path.display());
    Ok(exit_codes::OK)
}

fn cmd_new(prompt: &str, cfg: &AgentConfig) -> Result<i32> {
    let inference = OllamaClient::from_config(&cfg.inference).context("build inference client")?;
    let runner = CommandRunner::default();
    let installer = PipInstaller::new(
        &runner,
        cfg.validation.pip.clone(),
        Duration::from_secs(cfg.validation.install_timeout_secs),
    );
    let sink = ConsoleSink;
    let collaborators = Collaborators {
        inference: &inference,
        runner: &runner,
        installer: &installer,
        sink: &sink,
    };
    let base_dir = std::env::current_dir().context("resolve current directory")?;

    let outcome = new_project(prompt, &base_dir, cfg, &collaborators)?;
    debug!(root = %outcome.project_root().display(), "new project done");
    if outcome.succeeded() {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::CORRECTION_FAILED)
    }
}

/// Load the config file and apply CLI overrides.
fn resolve_config(cli: &Cli) -> Result<AgentConfig> {
    let mut cfg = load_config(&cli.config)?;
    if let Some(model) = &cli.planner_model {
        cfg.inference.planner_model = model.clone();
    }
    if let Some(model) = &cli.executor_model {
        cfg.inference.executor_model = model.clone();
    }
    if let Some(endpoint) = &cli.endpoint {
        cfg.inference.endpoint = endpoint.clone();
    }
    cfg.validate().context("invalid configuration after overrides")?;
    Ok(cfg)
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<PlanUnparseableError>().is_some()
        || err.downcast_ref::<InferenceError>().is_some()
    {
        exit_codes::PLAN_FAILED
    } else if err.downcast_ref::<InstallerFailure>().is_some() {
        exit_codes::INSTALL_FAILED
    } else {
        exit_codes::INVALID
    }
}
