//! Live checks of planner and executor models through `OllamaClient`.
//!
//! # Prerequisites
//!
//! - `ollama serve` listening on `http://localhost:11434` (or `DEVAGENT_ENDPOINT`)
//! - `ollama pull mistral:7b-instruct` and `ollama pull deepseek-coder:6.7b`
//!
//! # Running
//!
//! ```bash
//! cargo test -p devagent --test investigation_llm -- --ignored
//! ```

use std::time::Duration;

use devagent::core::extract::extract_code;
use devagent::io::config::InferenceConfig;
use devagent::io::inference::{Inference, OllamaClient};
use devagent::io::prompt::PromptEngine;
use devagent::planner::PromptPlanner;
use devagent::test_support::RecordingSink;

/// Generous timeout for cold model loads.
const LIVE_TIMEOUT: Duration = Duration::from_secs(300);

fn client() -> OllamaClient {
    let endpoint = std::env::var("DEVAGENT_ENDPOINT")
        .unwrap_or_else(|_| InferenceConfig::default().endpoint);
    OllamaClient::new(&endpoint, LIVE_TIMEOUT).expect("client")
}

/// The planner model produces a plan that survives sanitization.
#[test]
#[ignore]
fn planner_model_returns_sanitizable_plan() {
    let inference = client();
    let prompts = PromptEngine::new().expect("engine");
    let sink = RecordingSink::new();
    let cfg = InferenceConfig::default();
    let planner = PromptPlanner::new(&inference, &prompts, &cfg.planner_model, &sink);

    let plan = planner
        .plan("a flask api with a /health endpoint")
        .expect("plan");

    println!("project: {}", plan.project_name);
    for step in &plan.steps {
        println!("  {} {}", step.kind(), step.label());
    }
    assert!(!plan.steps.is_empty());
}

/// The executor model answers a generation prompt with extractable code.
#[test]
#[ignore]
fn executor_model_returns_extractable_code() {
    let inference = client();
    let prompts = PromptEngine::new().expect("engine");
    let cfg = InferenceConfig::default();
    let instruction = prompts
        .render_generate(
            "a hello world script",
            "main.py",
            "Print 'hello' to stdout.",
            "",
        )
        .expect("render");

    let reply = inference
        .infer(&cfg.executor_model, &instruction)
        .expect("infer");
    let code = extract_code(&reply);

    println!("raw reply:\n{reply}\n---\nextracted:\n{code}");
    assert!(!code.is_empty());
}
