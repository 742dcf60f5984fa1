//! Prompt rendering for the planner and executor models.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

const PLANNER_TEMPLATE: &str = include_str!("prompts/planner.md");
const REPAIR_TEMPLATE: &str = include_str!("prompts/repair.md");
const GENERATE_TEMPLATE: &str = include_str!("prompts/generate.md");
const FIX_TEMPLATE: &str = include_str!("prompts/fix.md");

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("planner", PLANNER_TEMPLATE)
            .context("load planner template")?;
        env.add_template("repair", REPAIR_TEMPLATE)
            .context("load repair template")?;
        env.add_template("generate", GENERATE_TEMPLATE)
            .context("load generate template")?;
        env.add_template("fix", FIX_TEMPLATE)
            .context("load fix template")?;
        Ok(Self { env })
    }

    /// Instruction asking the planner for a strict JSON plan for `request`.
    pub fn render_planner(&self, request: &str) -> Result<String> {
        let template = self.env.get_template("planner")?;
        let rendered = template
            .render(context! { request => request.trim() })
            .context("render planner prompt")?;
        Ok(rendered)
    }

    /// Instruction asking the planner to reformat `text` as strict JSON.
    pub fn render_repair(&self, text: &str) -> Result<String> {
        let template = self.env.get_template("repair")?;
        let rendered = template
            .render(context! { text => text })
            .context("render repair prompt")?;
        Ok(rendered)
    }

    /// Instruction asking the executor for the contents of one file.
    pub fn render_generate(
        &self,
        overview: &str,
        path: &str,
        task: &str,
        dependency_context: &str,
    ) -> Result<String> {
        let template = self.env.get_template("generate")?;
        let rendered = template
            .render(context! {
                overview => overview.trim(),
                path => path,
                task => task.trim(),
                context => (!dependency_context.trim().is_empty()).then_some(dependency_context),
            })
            .context("render generate prompt")?;
        Ok(rendered)
    }

    /// Instruction asking the executor for a full replacement of a failing file.
    pub fn render_fix(&self, path: &str, error: &str, code: &str) -> Result<String> {
        let template = self.env.get_template("fix")?;
        let rendered = template
            .render(context! {
                path => path,
                error => error.trim(),
                code => code,
            })
            .context("render fix prompt")?;
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planner_prompt_embeds_request_and_worked_example() {
        let engine = PromptEngine::new().expect("engine");
        let prompt = engine
            .render_planner("  a calculator API  ")
            .expect("render");
        assert!(prompt.contains("User request: \"a calculator API\""));
        assert!(prompt.contains("\"projectName\": \"multi-file-flask-api\""));
        assert!(prompt.contains("--- END EXAMPLE ---"));
    }

    #[test]
    fn generate_prompt_orders_overview_task_context() {
        let engine = PromptEngine::new().expect("engine");
        let prompt = engine
            .render_generate(
                "todo app",
                "app.py",
                "write the app",
                "Content of db.py:\nDB = {}\n\n",
            )
            .expect("render");

        let overview = prompt.find("Project overview: \"todo app\"").expect("overview");
        let task = prompt.find("write the app").expect("task");
        let context = prompt.find("Content of db.py").expect("context");
        assert!(overview < task && task < context);
        assert!(prompt.contains("DB = {}"), "context is not escaped");
    }

    #[test]
    fn generate_prompt_marks_missing_context() {
        let engine = PromptEngine::new().expect("engine");
        let prompt = engine
            .render_generate("x", "a.py", "y", "   ")
            .expect("render");
        assert!(prompt.contains("Existing files context:\n(none)"));
    }

    #[test]
    fn fix_prompt_includes_error_and_code() {
        let engine = PromptEngine::new().expect("engine");
        let prompt = engine
            .render_fix("app.py", "NameError: x\n", "print(x)")
            .expect("render");
        assert!(prompt.contains("file 'app.py'"));
        assert!(prompt.contains("NameError: x\n--- END ERROR MESSAGE ---"));
        assert!(prompt.contains("print(x)"));
    }
}
