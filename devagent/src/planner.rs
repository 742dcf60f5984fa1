//! Plan generation: planner request, sanitization, and the single repair round-trip.

use std::fmt;

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

use crate::core::sanitize::{complete_plan, parse_plan_object, prepare_candidate};
use crate::core::types::Event;
use crate::io::events::EventSink;
use crate::io::inference::{Inference, InferenceError};
use crate::io::prompt::PromptEngine;
use crate::plan::ProjectPlan;

/// Planner output that stayed unparseable after the repair request.
#[derive(Debug)]
pub struct PlanUnparseableError {
    /// Planner text as first received.
    pub raw: String,
    pub reason: String,
    source: Option<InferenceError>,
}

impl fmt::Display for PlanUnparseableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "planner output is not a valid plan: {}", self.reason)
    }
}

impl std::error::Error for PlanUnparseableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

/// Turns a free-text request into a fully typed [`ProjectPlan`].
pub struct PromptPlanner<'a, I: Inference> {
    inference: &'a I,
    prompts: &'a PromptEngine,
    model: &'a str,
    sink: &'a dyn EventSink,
}

impl<'a, I: Inference> PromptPlanner<'a, I> {
    pub fn new(
        inference: &'a I,
        prompts: &'a PromptEngine,
        model: &'a str,
        sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            inference,
            prompts,
            model,
            sink,
        }
    }

    /// Request a plan for `prompt` and sanitize it.
    pub fn plan(&self, prompt: &str) -> Result<ProjectPlan> {
        let raw = self.request(prompt)?;
        let plan = self.sanitize(&raw)?;
        self.sink.emit(Event::PlanReceived {
            project_name: plan.project_name.clone(),
            steps: plan.steps.len(),
        });
        Ok(plan)
    }

    /// Raw planner text for `prompt`.
    pub fn request(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            bail!("prompt must be non-empty");
        }
        let instruction = self.prompts.render_planner(prompt)?;
        self.sink.emit(Event::PlanRequested);
        let raw = self
            .inference
            .infer(self.model, &instruction)
            .context("request plan from planner model")?;
        debug!(len = raw.len(), "planner replied");
        Ok(raw)
    }

    /// Parse planner text, asking the planner once to reformat it on failure.
    pub fn sanitize(&self, raw: &str) -> Result<ProjectPlan> {
        let parse_error = match parse_plan_object(&prepare_candidate(raw)) {
            Ok(object) => return Ok(complete_plan(&object)),
            Err(err) => err,
        };
        warn!(error = %parse_error, "planner output unparseable, requesting repair");
        self.sink.emit(Event::PlanRepairRequested {
            parse_error: parse_error.clone(),
        });

        let instruction = self.prompts.render_repair(raw)?;
        let repaired = match self.inference.infer(self.model, &instruction) {
            Ok(text) => text,
            Err(err) => {
                return Err(PlanUnparseableError {
                    raw: raw.to_string(),
                    reason: format!("repair request failed after '{parse_error}'"),
                    source: Some(err),
                }
                .into());
            }
        };

        match parse_plan_object(&prepare_candidate(&repaired)) {
            Ok(object) => Ok(complete_plan(&object)),
            Err(reason) => Err(PlanUnparseableError {
                raw: raw.to_string(),
                reason,
                source: None,
            }
            .into()),
        }
    }
}
