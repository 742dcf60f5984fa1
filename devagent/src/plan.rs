use serde::Serialize;
use serde_json::Value;

/// Placeholder used when the planner omits `projectName` or returns an unusable one.
pub const DEFAULT_PROJECT_NAME: &str = "untitled-project";

/// Requirements file written by `CreateRequirementsFile` and read back by validation.
pub const REQUIREMENTS_FILE: &str = "requirements.txt";

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ProjectPlan {
    pub project_name: String,
    pub steps: Vec<Step>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    CreateDirectory {
        path: String,
    },
    GenerateFile {
        path: String,
        prompt: String,
        dependencies: Vec<String>,
        description: Option<String>,
    },
    CreateRequirementsFile {
        dependencies: Vec<String>,
    },
    Unknown {
        raw: Value,
    },
}

impl Step {
    /// Stable kind name, matching the planner's `type` vocabulary.
    pub fn kind(&self) -> &'static str {
        match self {
            Step::CreateDirectory { .. } => "create_directory",
            Step::GenerateFile { .. } => "generate_file",
            Step::CreateRequirementsFile { .. } => "create_requirements_file",
            Step::Unknown { .. } => "unknown",
        }
    }

    /// Human label for progress output.
    pub fn label(&self) -> String {
        match self {
            Step::GenerateFile {
                description: Some(description),
                ..
            } if !description.trim().is_empty() => description.trim().to_string(),
            _ => format!("Executing step type '{}'", self.kind()),
        }
    }
}

/// Reduce a planner-supplied project name to a single safe directory component.
pub fn sanitize_project_name(raw: &str) -> String {
    let replaced: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = replaced.trim_matches(|c| c == '-' || c == '.');
    if trimmed.is_empty() {
        DEFAULT_PROJECT_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}
